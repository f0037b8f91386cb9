//! File classification: named pattern groups and prefix-anchored matching.

pub mod groups;
pub mod matcher;

pub use groups::{FileGroup, Group, TestType};
pub use matcher::{MatchCache, PatternTable};
