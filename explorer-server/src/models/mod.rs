//! Data models

pub mod record;
pub mod collection;
pub mod batch;
pub mod ruleset;

pub use record::*;
pub use collection::*;
pub use batch::*;
pub use ruleset::*;
