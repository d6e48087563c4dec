use crossterm::event::KeyCode;

/// Events that can occur in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Quit the application
    Quit,
    /// Toggle help overlay
    ToggleHelp,
    /// Switch the side panel between tree and process details
    TogglePanel,
    /// No action
    None,
}

pub fn map_key(code: KeyCode) -> DashboardEvent {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => DashboardEvent::Quit,
        KeyCode::Char('?') | KeyCode::Char('h') => DashboardEvent::ToggleHelp,
        KeyCode::Char('t') => DashboardEvent::TogglePanel,
        _ => DashboardEvent::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(KeyCode::Char('q')), DashboardEvent::Quit);
        assert_eq!(map_key(KeyCode::Esc), DashboardEvent::Quit);
        assert_eq!(map_key(KeyCode::Char('?')), DashboardEvent::ToggleHelp);
        assert_eq!(map_key(KeyCode::Char('t')), DashboardEvent::TogglePanel);
        assert_eq!(map_key(KeyCode::Char('x')), DashboardEvent::None);
    }
}
