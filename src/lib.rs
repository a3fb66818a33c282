pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod paths;
pub mod pipeline;
pub mod watcher;

pub use config::Settings;
pub use engine::{DocumentEngine, EngineError, PdfEngine};
pub use paths::{ConfigurationError, PathArgs, WatchConfig};
pub use pipeline::{FileOutcome, IncomingFile, Pipeline, PipelineError};
pub use watcher::{DispatchStats, InboxWatcher, WatchError};
