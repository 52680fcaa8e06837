use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cmsgen_core::config::ToolConfig;

use crate::error::ToolError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Arguments of a single generator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Tool-specific flags placed between the paths and any configured extras.
    pub flags: Vec<String>,
    pub timeout: Duration,
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A code generator living outside this process.
pub trait ExternalTool {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Whether the tool can be invoked at all.
    fn is_available(&self) -> bool;

    /// Run the tool to completion or until `invocation.timeout` elapses.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError>;
}

/// An [`ExternalTool`] backed by a program on `PATH`.
#[derive(Debug, Clone)]
pub struct CommandTool {
    program: String,
    leading_args: Vec<String>,
    input_flag: String,
    output_flag: String,
    extra_args: Vec<String>,
}

impl CommandTool {
    pub fn new(program: impl Into<String>, input_flag: &str, output_flag: &str) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            input_flag: input_flag.to_string(),
            output_flag: output_flag.to_string(),
            extra_args: Vec::new(),
        }
    }

    /// `openapi-generator-cli generate -i <spec> -o <dir> ...`
    pub fn client_generator(config: &ToolConfig) -> Self {
        Self {
            leading_args: vec!["generate".to_string()],
            extra_args: config.extra_args.clone(),
            ..Self::new(&config.program, "-i", "-o")
        }
    }

    /// `datamodel-codegen --input <spec> --output <file> ...`
    pub fn model_generator(config: &ToolConfig) -> Self {
        Self {
            extra_args: config.extra_args.clone(),
            ..Self::new(&config.program, "--input", "--output")
        }
    }

    /// The full argument list for an invocation, program excluded.
    pub fn args(&self, invocation: &ToolInvocation) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.push(self.input_flag.clone());
        args.push(invocation.input.display().to_string());
        args.push(self.output_flag.clone());
        args.push(invocation.output.display().to_string());
        args.extend(invocation.flags.iter().cloned());
        args.extend(self.extra_args.iter().cloned());
        args
    }

    fn io_error(&self, source: std::io::Error) -> ToolError {
        ToolError::Io {
            tool: self.program.clone(),
            source,
        }
    }
}

impl ExternalTool for CommandTool {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let args = self.args(invocation);
        log::debug!("running {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ToolError::NotFound(self.program.clone()),
                _ => self.io_error(e),
            })?;

        // Drain both pipes so a chatty tool never blocks on a full buffer.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait_with_timeout(&mut child, invocation.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                reap(&mut child);
                log::warn!(
                    "{} exceeded {}s and was killed",
                    self.program,
                    invocation.timeout.as_secs()
                );
                return Err(ToolError::Timeout {
                    tool: self.program.clone(),
                    timeout: invocation.timeout,
                });
            }
            Err(e) => {
                reap(&mut child);
                return Err(self.io_error(e));
            }
        };

        let output = ToolOutput {
            stdout: collect(stdout),
            stderr: collect(stderr),
        };
        if status.success() {
            Ok(output)
        } else {
            Err(ToolError::Failed {
                tool: self.program.clone(),
                code: status.code(),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

/// Poll the child until it exits. `Ok(None)` means the deadline passed first.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child and collect its exit status so no zombie is left behind.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}
