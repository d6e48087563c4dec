// Platform-specific code module

pub mod host;
pub mod launch;
pub mod process;

// Re-exports para imports limpios
pub use host::SysinfoHost;
pub use launch::launch_executable;
pub use process::SysinfoProcessHandle;
