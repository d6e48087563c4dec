//! Terminal dashboard for a profiling session.
//!
//! Renders the frames produced by the sampler using ratatui.

mod app;
mod event_handler;
mod render;
mod widgets;

pub use app::{run_dashboard, DashboardApp, DashboardConfig};
pub use event_handler::{map_key, DashboardEvent};
