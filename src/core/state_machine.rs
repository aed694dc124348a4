//! State machine for tracking the build pipeline
//!
//! The pipeline only ever moves forward; the machine records each transition
//! so a finished (or failed) run can report where it stopped.

use chrono::{DateTime, Utc};

/// Build pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Initial,
    ResolvingProjectPath,
    ResolvingFlags,
    StagingCredentials,
    CreatingOutputLocation,
    Publishing,
    ReplacingSource,
    RemovingOutputLocation,
    Done,
    Failed,
}

impl BuildState {
    /// Terminal states accept no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// State transition
#[derive(Debug, Clone, PartialEq)]
pub struct StateTransition {
    pub from: BuildState,
    pub to: BuildState,
    pub timestamp: DateTime<Utc>,
}

/// In-memory state machine for one build invocation
#[derive(Debug)]
pub struct BuildStateMachine {
    current_state: BuildState,
    transitions: Vec<StateTransition>,
    error: Option<String>,
}

impl Default for BuildStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: BuildState::Initial,
            transitions: Vec::new(),
            error: None,
        }
    }

    /// Transition to a new state
    ///
    /// Transitions out of a terminal state are ignored.
    pub fn transition(&mut self, to: BuildState) {
        if self.current_state.is_terminal() {
            tracing::debug!(from = ?self.current_state, to = ?to, "ignoring transition out of terminal state");
            return;
        }

        tracing::debug!(from = ?self.current_state, to = ?to, "build state transition");

        self.transitions.push(StateTransition {
            from: self.current_state,
            to,
            timestamp: Utc::now(),
        });
        self.current_state = to;
    }

    /// Move to [`BuildState::Failed`], remembering the error message
    pub fn fail(&mut self, error: impl ToString) {
        if self.current_state.is_terminal() {
            return;
        }

        let error = error.to_string();
        tracing::debug!(state = ?self.current_state, %error, "build failed");
        self.transition(BuildState::Failed);
        self.error = Some(error);
    }

    pub fn get_state(&self) -> BuildState {
        self.current_state
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// States visited after `Initial`, in order
    pub fn visited(&self) -> Vec<BuildState> {
        self.transitions.iter().map(|t| t.to).collect()
    }

    pub fn get_last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Milliseconds between the first and the last transition
    pub fn get_elapsed_time(&self) -> i64 {
        match (self.transitions.first(), self.transitions.last()) {
            (Some(first), Some(last)) => (last.timestamp - first.timestamp).num_milliseconds(),
            _ => 0,
        }
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| format!("{}: {:?} → {:?}", t.timestamp.to_rfc3339(), t.from, t.to))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_machine() {
        let machine = BuildStateMachine::new();

        assert_eq!(machine.get_state(), BuildState::Initial);
        assert!(machine.transitions().is_empty());
        assert_eq!(machine.get_elapsed_time(), 0);
    }

    #[test]
    fn test_transition_records_history() {
        let mut machine = BuildStateMachine::new();

        machine.transition(BuildState::ResolvingProjectPath);
        machine.transition(BuildState::ResolvingFlags);

        assert_eq!(machine.get_state(), BuildState::ResolvingFlags);
        assert_eq!(
            machine.visited(),
            vec![BuildState::ResolvingProjectPath, BuildState::ResolvingFlags]
        );

        let history = machine.get_history();
        assert!(history.contains("Initial → ResolvingProjectPath"));
        assert!(history.contains("ResolvingProjectPath → ResolvingFlags"));
    }

    #[test]
    fn test_fail_is_terminal() {
        let mut machine = BuildStateMachine::new();

        machine.transition(BuildState::Publishing);
        machine.fail("dotnet publish failed");
        machine.transition(BuildState::ReplacingSource);

        assert_eq!(machine.get_state(), BuildState::Failed);
        assert_eq!(machine.get_last_error(), Some("dotnet publish failed"));
        assert_eq!(
            machine.visited(),
            vec![BuildState::Publishing, BuildState::Failed]
        );
    }

    #[test]
    fn test_done_is_terminal() {
        let mut machine = BuildStateMachine::new();

        machine.transition(BuildState::Done);
        machine.fail("late failure");

        assert_eq!(machine.get_state(), BuildState::Done);
        assert!(BuildState::Done.is_terminal());
        assert!(!BuildState::Publishing.is_terminal());
    }
}
