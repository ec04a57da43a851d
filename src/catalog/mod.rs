pub mod category;
pub mod naming;
pub mod resolver;

pub use resolver::{resolve_record, ResolutionContext};
