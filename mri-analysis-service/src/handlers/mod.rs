//! HTTP handlers for the analysis service.

pub mod analyze;
pub mod health;
pub mod metrics;
pub mod root;

pub use self::analyze::analyze_image;
pub use self::health::health_check;
pub use self::metrics::metrics_endpoint;
pub use self::root::root;
