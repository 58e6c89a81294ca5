pub mod engine;

pub use engine::{compute, hot_cold, rank_by_frequency};
