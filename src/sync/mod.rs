pub mod history;
pub mod model;
pub mod scheduler;
pub mod service;

pub use model::{SyncError, SyncState, SyncStatus};
pub use scheduler::spawn_daily;
pub use service::SyncService;
