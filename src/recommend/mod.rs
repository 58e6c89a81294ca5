pub mod sampler;

pub use sampler::{is_balanced, weighted_pick, RecommendationSampler, Sample, SamplePath};
