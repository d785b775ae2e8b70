pub mod monitor;

pub use monitor::{ProgressEvent, ProgressMonitor, ProgressReporter};
