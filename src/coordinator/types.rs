//! Public types for the board coordinator.

/// Board lifecycle state.
///
/// A [`super::Board`] only exists once its stores are open, so the first
/// state any watcher sees is `Ready`.
///
/// Use [`super::Board::state()`] to check the current state or
/// [`super::Board::state_receiver()`] to watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardState {
    /// Stores open, accepting requests
    Ready,
    /// Serving requests with the sweeper scheduled
    Running,
    /// Graceful shutdown in progress
    ShuttingDown,
}

impl std::fmt::Display for BoardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Running => write!(f, "Running"),
            Self::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_state_display() {
        assert_eq!(format!("{}", BoardState::Ready), "Ready");
        assert_eq!(format!("{}", BoardState::Running), "Running");
        assert_eq!(format!("{}", BoardState::ShuttingDown), "ShuttingDown");
    }
}
