pub mod amfi;
pub mod filter;
pub mod types;

pub use amfi::AmfiFeedSource;
pub use filter::filter_records;
pub use types::{FeedError, FeedRecord, FeedSource};
#[cfg(test)]
pub use types::StaticFeed;
