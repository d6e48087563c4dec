// Command handlers module
pub mod completions;
pub mod config;
pub mod run;
pub mod version;

// Re-exports for cleaner imports
pub use run::{execute_attach as attach, execute_run as run};
pub use version::execute as version;
