pub mod analyzer;
pub mod imaging;
pub mod metrics;
pub mod pacing;
pub mod prompt;
pub mod providers;

pub use self::analyzer::{AnalysisError, FailureKind, MriAnalyzer};
pub use self::metrics::{get_metrics, init_metrics};
pub use self::pacing::Pacer;
