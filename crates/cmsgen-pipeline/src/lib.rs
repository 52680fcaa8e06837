pub mod batch;
pub mod enhance;
pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod task;
pub mod tool;

pub use batch::{BatchDriver, BatchReport, ReportEntry};
pub use error::{GenerateError, PipelineError, ToolError};
pub use observer::{ProgressEvent, ProgressObserver, TextObserver};
pub use orchestrator::{GenerationSettings, Orchestrator};
pub use task::{GenerationTask, Stage};
pub use tool::{CommandTool, ExternalTool, ToolInvocation, ToolOutput};
