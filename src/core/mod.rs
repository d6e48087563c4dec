// Core business logic module

pub mod config;
pub mod profiler;

// Re-export commonly used items
pub use config::Config;
pub use profiler::{ProfilerRuntime, SampleFrame, Sampler, SamplerConfig, SessionReport};
