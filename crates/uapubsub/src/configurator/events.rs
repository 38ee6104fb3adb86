// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Change notifications emitted by the configurator.
//!
//! Events are collected while the configuration lock is held and delivered
//! after it is released, so listeners may call back into the configurator.

use super::node::{ConfigId, ConfigKind, ConfigObject};
use super::state::PubSubState;
use crossbeam::channel::Sender;

/// A configuration change.
#[derive(Debug, Clone)]
pub enum ConfiguratorEvent {
    /// `object` is the added object without its children; each child gets
    /// its own `Added` event after the parent's.
    Added {
        id: ConfigId,
        parent_id: ConfigId,
        object: ConfigObject,
    },
    /// Children are reported removed before their parent.
    Removed {
        id: ConfigId,
        parent_id: ConfigId,
        object: ConfigObject,
    },
    StateChanged {
        id: ConfigId,
        kind: ConfigKind,
        old_state: PubSubState,
        new_state: PubSubState,
    },
}

impl ConfiguratorEvent {
    pub fn id(&self) -> ConfigId {
        match self {
            Self::Added { id, .. } | Self::Removed { id, .. } | Self::StateChanged { id, .. } => {
                *id
            }
        }
    }

    pub fn kind(&self) -> ConfigKind {
        match self {
            Self::Added { object, .. } | Self::Removed { object, .. } => object.kind(),
            Self::StateChanged { kind, .. } => *kind,
        }
    }
}

/// Observer of configuration changes.
pub trait ConfiguratorListener: Send + Sync {
    fn on_configurator_event(&self, event: &ConfiguratorEvent);
}

/// Forward events into a channel.
impl ConfiguratorListener for Sender<ConfiguratorEvent> {
    fn on_configurator_event(&self, event: &ConfiguratorEvent) {
        if self.send(event.clone()).is_err() {
            tracing::debug!("Configurator event channel closed, dropping {:?}", event.kind());
        }
    }
}
