pub mod errors;
pub mod logger;
pub mod profiler;
pub mod timer;

pub use errors::{Diagnostic, DiagnosticSeverity};
pub use logger::{init_logging, init_logging_with};
pub use profiler::{PhaseTiming, Profiler};
pub use timer::Stopwatch;
