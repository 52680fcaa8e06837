use std::fmt;
use std::path::{Path, PathBuf};

use heck::{ToPascalCase, ToSnakeCase};

/// A step of the per-module chain, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Completion,
    Conversion,
    DependencyCheck,
    ClientGeneration,
    ModelGeneration,
    Enhancement,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Completion,
        Stage::Conversion,
        Stage::DependencyCheck,
        Stage::ClientGeneration,
        Stage::ModelGeneration,
        Stage::Enhancement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Completion => "completion",
            Stage::Conversion => "conversion",
            Stage::DependencyCheck => "dependency check",
            Stage::ClientGeneration => "client generation",
            Stage::ModelGeneration => "model generation",
            Stage::Enhancement => "enhancement",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One API module's trip through the pipeline.
///
/// All output paths derive from the module's snake-case name, so distinct
/// modules never write to the same location.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub name: String,
    /// Python package of the generated client (`<prefix>_<module>`).
    pub package: String,
    /// Class-name stem used by the enhancement module.
    pub class_stem: String,
    pub raw_spec: PathBuf,
    pub completed_spec: PathBuf,
    pub converted_spec: PathBuf,
    pub client_dir: PathBuf,
    pub model_file: PathBuf,
    pub enhancement_file: PathBuf,
    outcomes: Vec<(Stage, bool)>,
}

impl GenerationTask {
    pub fn new(name: &str, raw_spec: PathBuf, output_dir: &Path, package_prefix: &str) -> Self {
        let snake = name.to_snake_case();
        let package = if package_prefix.is_empty() {
            snake.clone()
        } else {
            format!("{}_{}", package_prefix.to_snake_case(), snake)
        };
        let specs = output_dir.join("specs").join(&snake);
        Self {
            name: name.to_string(),
            class_stem: name.to_pascal_case(),
            raw_spec,
            completed_spec: specs.join("swagger.yaml"),
            converted_spec: specs.join("openapi.yaml"),
            client_dir: output_dir.join("clients").join(&snake),
            model_file: output_dir.join("models").join(format!("{snake}.py")),
            enhancement_file: output_dir.join("enhanced").join(format!("{snake}.py")),
            package,
            outcomes: Vec::new(),
        }
    }

    /// Dotted import path of the generated models module, relative to the
    /// output root.
    pub fn model_module(&self) -> String {
        format!("models.{}", self.name.to_snake_case())
    }

    pub fn record(&mut self, stage: Stage, success: bool) {
        self.outcomes.push((stage, success));
    }

    pub fn outcomes(&self) -> &[(Stage, bool)] {
        &self.outcomes
    }

    /// The last stage attempted, if any.
    pub fn stage_reached(&self) -> Option<Stage> {
        self.outcomes.last().map(|(stage, _)| *stage)
    }

    pub fn succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|(_, ok)| *ok)
    }
}
