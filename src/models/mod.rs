//! Core data models for the clan tracker.

mod bundle;
mod clan;
mod ids;
mod match_record;
mod shard;
mod style;

pub use bundle::*;
pub use clan::*;
pub use ids::*;
pub use match_record::*;
pub use shard::*;
pub use style::*;
