// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PubSub object lifecycle state (Part 14, 9.1.10).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a configuration object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PubSubState {
    Disabled,
    /// Enabled, but a parent is not operational.
    Paused,
    Operational,
    Error,
}

impl PubSubState {
    /// State of a freshly added object.
    pub fn initial(enabled: bool, parent: Option<PubSubState>) -> Self {
        match (enabled, parent) {
            (false, _) => Self::Disabled,
            (true, None | Some(Self::Operational)) => Self::Operational,
            (true, Some(_)) => Self::Paused,
        }
    }

    /// Value of the object's `enabled` flag in this state.
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Operational | Self::Paused)
    }

    /// State a child moves to after its parent entered `parent`, if any.
    pub fn follow_parent(self, parent: PubSubState) -> Option<Self> {
        match (parent, self) {
            (Self::Operational, Self::Paused) => Some(Self::Operational),
            (Self::Disabled | Self::Paused, Self::Operational | Self::Error) => Some(Self::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for PubSubState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(PubSubState::initial(false, None), PubSubState::Disabled);
        assert_eq!(PubSubState::initial(true, None), PubSubState::Operational);
        assert_eq!(
            PubSubState::initial(true, Some(PubSubState::Operational)),
            PubSubState::Operational
        );
        assert_eq!(
            PubSubState::initial(true, Some(PubSubState::Disabled)),
            PubSubState::Paused
        );
        assert_eq!(
            PubSubState::initial(false, Some(PubSubState::Operational)),
            PubSubState::Disabled
        );
    }

    #[test]
    fn test_follow_parent() {
        use PubSubState::*;
        assert_eq!(Paused.follow_parent(Operational), Some(Operational));
        assert_eq!(Operational.follow_parent(Disabled), Some(Paused));
        assert_eq!(Error.follow_parent(Paused), Some(Paused));
        assert_eq!(Disabled.follow_parent(Operational), None);
        assert_eq!(Disabled.follow_parent(Paused), None);
        assert_eq!(Operational.follow_parent(Operational), None);
    }

    #[test]
    fn test_enabled_flag() {
        assert!(PubSubState::Operational.is_enabled());
        assert!(PubSubState::Paused.is_enabled());
        assert!(!PubSubState::Disabled.is_enabled());
        assert!(!PubSubState::Error.is_enabled());
    }
}
