use std::fmt;
use std::io::{self, Write};

use crate::task::{GenerationTask, Stage};

/// Structured progress of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    ModuleStarted {
        module: String,
    },
    StageSucceeded {
        module: String,
        stage: Stage,
    },
    StageFailed {
        module: String,
        stage: Stage,
        error: String,
    },
    /// The module was never attempted because the batch cannot succeed.
    ModuleSkipped {
        module: String,
        reason: String,
    },
    BatchFinished {
        total: usize,
        succeeded: usize,
    },
}

/// Receives progress events as they happen.
pub trait ProgressObserver {
    fn on_event(&mut self, event: &ProgressEvent);
}

/// Collects events for later inspection.
impl ProgressObserver for Vec<ProgressEvent> {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.push(event.clone());
    }
}

/// Renders events as human-readable lines.
pub struct TextObserver<W: Write> {
    out: W,
}

impl TextObserver<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextObserver<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressObserver for TextObserver<W> {
    fn on_event(&mut self, event: &ProgressEvent) {
        // Progress output is best-effort; a closed stdout must not fail the batch.
        let _ = match event {
            ProgressEvent::ModuleStarted { module } => writeln!(self.out, "==> {module}"),
            ProgressEvent::StageSucceeded { stage, .. } => writeln!(self.out, "  ok    {stage}"),
            ProgressEvent::StageFailed { stage, error, .. } => {
                writeln!(self.out, "  FAIL  {stage}: {error}")
            }
            ProgressEvent::ModuleSkipped { module, reason } => {
                writeln!(self.out, "==> {module} skipped: {reason}")
            }
            ProgressEvent::BatchFinished { total, succeeded } => {
                writeln!(self.out, "finished: {succeeded}/{total} modules succeeded")
            }
        };
        let _ = self.out.flush();
    }
}

/// Record a stage outcome on the task and report it, passing the result on.
pub(crate) fn track<T, E: fmt::Display>(
    task: &mut GenerationTask,
    stage: Stage,
    observer: &mut dyn ProgressObserver,
    result: Result<T, E>,
) -> Result<T, E> {
    match &result {
        Ok(_) => {
            log::debug!("{}: {} succeeded", task.name, stage);
            task.record(stage, true);
            observer.on_event(&ProgressEvent::StageSucceeded {
                module: task.name.clone(),
                stage,
            });
        }
        Err(err) => {
            log::debug!("{}: {} failed: {}", task.name, stage, err);
            task.record(stage, false);
            observer.on_event(&ProgressEvent::StageFailed {
                module: task.name.clone(),
                stage,
                error: err.to_string(),
            });
        }
    }
    result
}
