//! Guarded transitions for lifecycle enums.

use thiserror::Error;

/// A transition the lifecycle does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: String,
    pub to: String,
}

/// A lifecycle whose states change only along declared edges.
///
/// ```ignore
/// let state = SessionState::Unauthenticated.transition_to(SessionState::Authenticated)?;
/// ```
pub trait StateMachine: Sized + Copy + std::fmt::Debug {
    /// Whether `target` is reachable from `self` in one step.
    fn can_transition_to(&self, target: &Self) -> bool;

    fn transition_to(&self, target: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(InvalidTransition {
                from: format!("{:?}", self),
                to: format!("{:?}", target),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Door {
        Open,
        Shut,
        Locked,
    }

    impl StateMachine for Door {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Door::*;
            matches!(
                (self, target),
                (Open, Shut) | (Shut, Open) | (Shut, Locked) | (Locked, Shut)
            )
        }
    }

    #[test]
    fn allowed_edge_yields_target() {
        assert_eq!(Door::Shut.transition_to(Door::Locked), Ok(Door::Locked));
    }

    #[test]
    fn missing_edge_names_both_states() {
        let err = Door::Open.transition_to(Door::Locked).unwrap_err();
        assert_eq!(err.to_string(), "cannot move from Open to Locked");
    }
}
