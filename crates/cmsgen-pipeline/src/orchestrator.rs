use std::fs;
use std::path::Path;
use std::time::Duration;

use cmsgen_core::config::CmsgenConfig;

use crate::enhance::render_enhancement;
use crate::error::GenerateError;
use crate::observer::{ProgressObserver, track};
use crate::task::{GenerationTask, Stage};
use crate::tool::{ExternalTool, ToolInvocation, ToolOutput};

/// Target language handed to the client generator.
pub const CLIENT_LANGUAGE: &str = "python";

/// Flags handed to the model generator after its input and output paths.
pub const MODEL_FLAGS: [&str; 4] = [
    "--input-file-type",
    "openapi",
    "--output-model-type",
    "pydantic_v2.BaseModel",
];

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub language: String,
    /// Upper bound on every external invocation.
    pub timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            language: CLIENT_LANGUAGE.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GenerationSettings {
    pub fn from_config(config: &CmsgenConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            ..Self::default()
        }
    }
}

/// Drives the external generators for one converted document at a time.
///
/// The orchestrator only looks at exit status. Whatever the tools write is
/// theirs; the enhancement module relies solely on the output paths fixed by
/// [`GenerationTask`].
pub struct Orchestrator<'a> {
    client: &'a dyn ExternalTool,
    models: &'a dyn ExternalTool,
    settings: GenerationSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        client: &'a dyn ExternalTool,
        models: &'a dyn ExternalTool,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            client,
            models,
            settings,
        }
    }

    /// Fail with `MissingDependency` naming every tool that cannot be invoked.
    pub fn check_dependencies(&self) -> Result<(), GenerateError> {
        let missing: Vec<&str> = [self.client, self.models]
            .into_iter()
            .filter(|tool| !tool.is_available())
            .map(|tool| tool.name())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GenerateError::MissingDependency(missing.join(", ")))
        }
    }

    pub fn generate_client(&self, task: &GenerationTask) -> Result<ToolOutput, GenerateError> {
        ensure_dir(&task.client_dir)?;
        let invocation = ToolInvocation {
            input: task.converted_spec.clone(),
            output: task.client_dir.clone(),
            flags: vec![
                "-g".to_string(),
                self.settings.language.clone(),
                "--package-name".to_string(),
                task.package.clone(),
            ],
            timeout: self.settings.timeout,
        };
        Ok(self.client.run(&invocation)?)
    }

    pub fn generate_models(&self, task: &GenerationTask) -> Result<ToolOutput, GenerateError> {
        if let Some(parent) = task.model_file.parent() {
            ensure_dir(parent)?;
        }
        let invocation = ToolInvocation {
            input: task.converted_spec.clone(),
            output: task.model_file.clone(),
            flags: MODEL_FLAGS.iter().map(|f| f.to_string()).collect(),
            timeout: self.settings.timeout,
        };
        Ok(self.models.run(&invocation)?)
    }

    pub fn write_enhancement(&self, task: &GenerationTask) -> Result<(), GenerateError> {
        let content = render_enhancement(task)?;
        if let Some(parent) = task.enhancement_file.parent() {
            ensure_dir(parent)?;
        }
        fs::write(&task.enhancement_file, content).map_err(|source| GenerateError::Io {
            path: task.enhancement_file.clone(),
            source,
        })
    }

    /// Dependency check, client, models, enhancement. Stops at the first
    /// failing stage.
    pub fn generate(
        &self,
        task: &mut GenerationTask,
        observer: &mut dyn ProgressObserver,
    ) -> Result<(), GenerateError> {
        track(task, Stage::DependencyCheck, observer, self.check_dependencies())?;

        let result = self.generate_client(task);
        track(task, Stage::ClientGeneration, observer, result)?;

        let result = self.generate_models(task);
        track(task, Stage::ModelGeneration, observer, result)?;

        let result = self.write_enhancement(task);
        track(task, Stage::Enhancement, observer, result)
    }
}

fn ensure_dir(path: &Path) -> Result<(), GenerateError> {
    fs::create_dir_all(path).map_err(|source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    })
}
