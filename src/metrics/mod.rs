pub mod engine;
pub mod rating;
pub mod stats;
pub mod trigger;
pub mod worker;

pub use engine::MetricsService;
pub use trigger::MetricsTrigger;
pub use worker::MetricsWorker;
