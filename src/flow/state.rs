//! Dialogue states — where a sender currently is in a flow.

use serde::{Deserialize, Serialize};

/// Which multi-step flow a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    /// Discussion proposal: name → participants → content → summary.
    Proposal,
}

/// The kind of input a state is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Selection,
}

/// The states of the conversation.
///
/// Every flow starts from `Idle` via a top-level selection. `ProposalComplete`
/// is transient: the engine resets straight back to `Idle` after building the
/// summary, so it is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    ProposalChoice,
    ProposalNewName,
    ProposalNewParticipants,
    ProposalNewContent,
    ProposalComplete,
}

impl FlowState {
    /// The flow this state belongs to, or `None` for `Idle`.
    pub fn flow(&self) -> Option<FlowKind> {
        match self {
            Self::Idle => None,
            Self::ProposalChoice
            | Self::ProposalNewName
            | Self::ProposalNewParticipants
            | Self::ProposalNewContent
            | Self::ProposalComplete => Some(FlowKind::Proposal),
        }
    }

    /// Whether this state accepts the given input kind.
    pub fn expects(&self, kind: InputKind) -> bool {
        match self {
            Self::Idle => true,
            Self::ProposalChoice => kind == InputKind::Selection,
            Self::ProposalNewName | Self::ProposalNewParticipants | Self::ProposalNewContent => {
                kind == InputKind::Text
            }
            Self::ProposalComplete => false,
        }
    }

    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Resets to `Idle` are always allowed and are not listed here.
    pub fn can_transition_to(&self, target: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, target),
            (Idle, ProposalChoice)
                | (ProposalChoice, ProposalNewName)
                | (ProposalNewName, ProposalNewParticipants)
                | (ProposalNewParticipants, ProposalNewContent)
                | (ProposalNewContent, ProposalComplete)
        ) || target == Idle
    }

    /// Whether this state ends a flow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ProposalComplete)
    }
}

impl Default for FlowState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::ProposalChoice => "proposal_choice",
            Self::ProposalNewName => "proposal_new_name",
            Self::ProposalNewParticipants => "proposal_new_participants",
            Self::ProposalNewContent => "proposal_new_content",
            Self::ProposalComplete => "proposal_complete",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [FlowState; 6] = [
        FlowState::Idle,
        FlowState::ProposalChoice,
        FlowState::ProposalNewName,
        FlowState::ProposalNewParticipants,
        FlowState::ProposalNewContent,
        FlowState::ProposalComplete,
    ];

    #[test]
    fn valid_transitions() {
        use FlowState::*;
        let transitions = [
            (Idle, ProposalChoice),
            (ProposalChoice, ProposalNewName),
            (ProposalNewName, ProposalNewParticipants),
            (ProposalNewParticipants, ProposalNewContent),
            (ProposalNewContent, ProposalComplete),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use FlowState::*;
        // Skip steps
        assert!(!Idle.can_transition_to(ProposalNewName));
        assert!(!ProposalChoice.can_transition_to(ProposalNewContent));
        // Go backward
        assert!(!ProposalNewContent.can_transition_to(ProposalNewName));
        // Self-transition
        assert!(!ProposalNewName.can_transition_to(ProposalNewName));
    }

    #[test]
    fn every_state_can_reset() {
        for state in ALL {
            assert!(state.can_transition_to(FlowState::Idle), "{state} should reset");
        }
    }

    #[test]
    fn only_idle_has_no_flow() {
        for state in ALL {
            assert_eq!(state.flow().is_none(), state == FlowState::Idle);
        }
    }

    #[test]
    fn expected_inputs() {
        use FlowState::*;
        assert!(Idle.expects(InputKind::Text));
        assert!(Idle.expects(InputKind::Selection));
        assert!(ProposalChoice.expects(InputKind::Selection));
        assert!(!ProposalChoice.expects(InputKind::Text));
        for state in [ProposalNewName, ProposalNewParticipants, ProposalNewContent] {
            assert!(state.expects(InputKind::Text));
            assert!(!state.expects(InputKind::Selection));
        }
        assert!(!ProposalComplete.expects(InputKind::Text));
    }

    #[test]
    fn is_terminal() {
        assert!(FlowState::ProposalComplete.is_terminal());
        assert!(!FlowState::Idle.is_terminal());
        assert!(!FlowState::ProposalNewContent.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        for state in ALL {
            let display = format!("{state}");
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(
                format!("\"{display}\""),
                json,
                "Display and serde should match for {state:?}"
            );
        }
    }

    #[test]
    fn default_is_idle() {
        assert_eq!(FlowState::default(), FlowState::Idle);
    }
}
