use std::fmt::Write as _;
use std::path::Path;

use cmsgen_core::config::CmsgenConfig;
use cmsgen_core::{SpecDocument, complete, convert};

use crate::error::PipelineError;
use crate::observer::{ProgressEvent, ProgressObserver, track};
use crate::orchestrator::Orchestrator;
use crate::task::{GenerationTask, Stage};

/// Outcome of one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub module: String,
    /// The last stage attempted.
    pub stage: Stage,
    pub success: bool,
    pub detail: Option<String>,
}

/// Per-module outcomes of a batch run, in run order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    entries: Vec<ReportEntry>,
}

impl BatchReport {
    pub fn push(&mut self, entry: ReportEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn entry(&self, module: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.module == module)
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.success).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| !e.success)
    }

    pub fn all_succeeded(&self) -> bool {
        self.entries.iter().all(|e| e.success)
    }

    /// Process exit status for this report.
    pub fn exit_code(&self) -> u8 {
        if self.all_succeeded() { 0 } else { 1 }
    }

    /// Human-readable summary listing every module.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} of {} modules succeeded",
            self.succeeded(),
            self.total()
        );
        for entry in &self.entries {
            let _ = match (entry.success, &entry.detail) {
                (true, _) => writeln!(out, "  {:<12} ok ({})", entry.module, entry.stage),
                (false, Some(detail)) => writeln!(
                    out,
                    "  {:<12} failed at {}: {}",
                    entry.module, entry.stage, detail
                ),
                (false, None) => {
                    writeln!(out, "  {:<12} failed at {}", entry.module, entry.stage)
                }
            };
        }
        out
    }
}

/// Runs every configured module through completion, conversion and
/// generation, one module at a time.
pub struct BatchDriver<'a> {
    config: &'a CmsgenConfig,
    orchestrator: Orchestrator<'a>,
    dry_run: bool,
}

impl<'a> BatchDriver<'a> {
    pub fn new(config: &'a CmsgenConfig, orchestrator: Orchestrator<'a>) -> Self {
        Self {
            config,
            orchestrator,
            dry_run: false,
        }
    }

    /// Stop each module after conversion, without touching external tools.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn tasks(&self) -> Vec<GenerationTask> {
        let output_dir = Path::new(&self.config.output_dir);
        self.config
            .modules
            .iter()
            .map(|module| {
                GenerationTask::new(
                    module,
                    self.config.spec_path(module),
                    output_dir,
                    &self.config.package_prefix,
                )
            })
            .collect()
    }

    /// Attempt every module. Failures are recorded, never propagated.
    pub fn run(&self, observer: &mut dyn ProgressObserver) -> BatchReport {
        let mut report = BatchReport::default();
        let mut fatal: Option<String> = None;

        for mut task in self.tasks() {
            if let Some(reason) = &fatal {
                observer.on_event(&ProgressEvent::ModuleSkipped {
                    module: task.name.clone(),
                    reason: reason.clone(),
                });
                report.push(ReportEntry {
                    module: task.name,
                    stage: Stage::DependencyCheck,
                    success: false,
                    detail: Some(format!("skipped: {reason}")),
                });
                continue;
            }

            observer.on_event(&ProgressEvent::ModuleStarted {
                module: task.name.clone(),
            });
            let result = self.run_task(&mut task, observer);
            let stage = task.stage_reached().unwrap_or(Stage::Completion);
            let detail = match result {
                Ok(()) => None,
                Err(err) => {
                    if err.is_batch_fatal() {
                        log::error!("{err}; remaining modules will be skipped");
                        fatal = Some(err.to_string());
                    }
                    Some(err.to_string())
                }
            };
            report.push(ReportEntry {
                module: task.name.clone(),
                stage,
                success: task.succeeded(),
                detail,
            });
        }

        observer.on_event(&ProgressEvent::BatchFinished {
            total: report.total(),
            succeeded: report.succeeded(),
        });
        report
    }

    fn run_task(
        &self,
        task: &mut GenerationTask,
        observer: &mut dyn ProgressObserver,
    ) -> Result<(), PipelineError> {
        let result = SpecDocument::from_path(&task.raw_spec)
            .and_then(|raw| complete(&raw, &task.name))
            .and_then(|doc| doc.write_to(&task.completed_spec).map(|()| doc));
        let completed = track(task, Stage::Completion, observer, result)?;

        let result = convert(&completed).and_then(|conversion| {
            conversion.document.write_to(&task.converted_spec)?;
            Ok(conversion.warnings)
        });
        let warnings = track(task, Stage::Conversion, observer, result)?;
        if !warnings.is_empty() {
            log::warn!(
                "{}: {} reference(s) left unresolved",
                task.name,
                warnings.len()
            );
        }

        if self.dry_run {
            return Ok(());
        }
        self.orchestrator.generate(task, observer)?;
        Ok(())
    }
}
