//! Run status lifecycle.
//!
//! The store carries `status` as an enum string owned by the flow authoring
//! subsystem, so variants map to text literals rather than lookup-table ids.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a patchflow run.
///
/// Transitions are monotonic forward:
/// `Pending -> Running -> {PrCreated, Failed}`. A run never returns to
/// `Pending` once claimed, and terminal states have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    /// Terminal success: the patchflow exited 0.
    PrCreated,
    /// Terminal failure: nonzero exit, spawn failure, or timeout.
    Failed,
}

impl RunStatus {
    /// All variants, in lifecycle order.
    pub const ALL: [RunStatus; 4] = [
        RunStatus::Pending,
        RunStatus::Running,
        RunStatus::PrCreated,
        RunStatus::Failed,
    ];

    /// Status literal as stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::PrCreated => "pr_created",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored status literal. Unknown literals yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "pr_created" => Some(Self::PrCreated),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// `true` for statuses with no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::PrCreated | Self::Failed)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::PrCreated)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_round_trip() {
        for status in RunStatus::ALL {
            assert_eq!(RunStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RunStatus::parse("cancelled"), None);
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for from in RunStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in RunStatus::ALL {
                assert!(
                    !from.can_transition_to(to),
                    "{from} -> {to} must be forbidden"
                );
            }
        }
    }

    #[test]
    fn pending_only_moves_to_running() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::PrCreated));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Pending));
    }

    #[test]
    fn running_reaches_both_terminals() {
        assert!(RunStatus::Running.can_transition_to(RunStatus::PrCreated));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Running.can_transition_to(RunStatus::Pending));
    }

    #[test]
    fn serde_uses_store_literals() {
        let json = serde_json::to_string(&RunStatus::PrCreated).expect("serialize");
        assert_eq!(json, "\"pr_created\"");
    }
}
