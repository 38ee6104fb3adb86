// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Authoritative in-memory PubSub configuration.
//!
//! The configurator owns the configuration tree as an arena of nodes keyed by
//! [`ConfigId`]. Each node holds the object with its child collections
//! stripped, its parent id, its [`PubSubState`] and its ordered child ids.
//!
//! ```text
//! add_connection(conn{writer_groups:[g{writers:[w]}]})
//!   -> Added(conn) -> Added(g) -> Added(w)       (parent before child)
//! remove(conn)
//!   -> Removed(w) -> Removed(g) -> Removed(conn) (children first)
//! disable(conn)
//!   -> StateChanged(conn: Operational->Disabled)
//!   -> StateChanged(g: Operational->Paused) -> StateChanged(w: ...->Paused)
//! ```
//!
//! All mutations are serialized by one lock. Events are collected while it is
//! held and delivered to [`ConfiguratorListener`]s once it is released.

mod events;
mod node;
mod state;


pub use events::{ConfiguratorEvent, ConfiguratorListener};
pub use node::{ConfigId, ConfigKind, ConfigObject};
pub use state::PubSubState;

use crate::error::{PubSubError, Result};
use crate::types::{
    DataSetMetaData, DataSetReaderDataType, DataSetWriterDataType, KeyValuePair,
    PubSubConfiguration, PubSubConnectionDataType, PublishedDataSetDataType,
    ReaderGroupDataType, WriterGroupDataType,
};
use node::ConfigNode;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};

// ============================================================================
// Arena
// ============================================================================

struct ConfigTree {
    nodes: HashMap<ConfigId, ConfigNode>,
    root: ConfigId,
}

impl ConfigTree {
    fn new() -> Self {
        let root = ConfigId::next();
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            ConfigNode {
                object: ConfigObject::PubSubConfiguration(PubSubConfiguration::default()),
                parent: ConfigId::INVALID,
                state: PubSubState::Operational,
                children: Vec::new(),
            },
        );
        Self { nodes, root }
    }

    fn node(&self, id: ConfigId) -> Result<&ConfigNode> {
        self.nodes.get(&id).ok_or(PubSubError::NodeIdUnknown(id))
    }

    fn node_of_kind(&self, id: ConfigId, expected: ConfigKind) -> Result<&ConfigNode> {
        let node = self.node(id)?;
        let actual = node.object.kind();
        if actual != expected {
            return Err(PubSubError::NodeIdInvalid {
                id,
                expected,
                actual,
            });
        }
        Ok(node)
    }

    fn find_child(&self, parent: ConfigId, kind: ConfigKind, name: &str) -> Option<ConfigId> {
        self.nodes.get(&parent)?.children.iter().copied().find(|child| {
            self.nodes
                .get(child)
                .is_some_and(|n| n.object.kind() == kind && n.object.name() == name)
        })
    }

    fn add(
        &mut self,
        parent_id: ConfigId,
        mut object: ConfigObject,
        events: &mut Vec<ConfiguratorEvent>,
    ) -> Result<ConfigId> {
        let kind = object.kind();
        let expected_parent = kind.parent_kind().ok_or_else(|| {
            PubSubError::InvalidArgument("the configuration root cannot be added".into())
        })?;
        let parent = self.nodes.get(&parent_id).ok_or_else(|| {
            PubSubError::InvalidArgument(format!("parent id {} does not exist", parent_id))
        })?;
        let parent_kind = parent.object.kind();
        if parent_kind != expected_parent {
            return Err(PubSubError::InvalidArgument(format!(
                "a {} cannot be added to a {} (id {})",
                kind, parent_kind, parent_id
            )));
        }
        let parent_state = parent.state;

        let mut id = ConfigId::INVALID;
        if object.name().is_empty() {
            id = ConfigId::next();
            object.set_name(format!("{}_{}", kind, id));
        }
        if self.find_child(parent_id, kind, object.name()).is_some() {
            return Err(PubSubError::BrowseNameDuplicated(object.name().to_string()));
        }
        if !id.is_valid() {
            id = ConfigId::next();
        }

        let children = object.take_children();
        let state = match object.as_enableable() {
            Some(e) => PubSubState::initial(e.enabled(), Some(parent_state)),
            None => PubSubState::Operational,
        };
        debug!(
            "Added {} '{}' (id {}) under {} in state {}",
            kind,
            object.name(),
            id,
            parent_id,
            state
        );

        events.push(ConfiguratorEvent::Added {
            id,
            parent_id,
            object: object.clone(),
        });
        self.nodes.insert(
            id,
            ConfigNode {
                object,
                parent: parent_id,
                state,
                children: Vec::new(),
            },
        );
        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.push(id);
        }

        for child in children {
            let child_kind = child.kind();
            let child_name = child.name().to_string();
            if let Err(e) = self.add(id, child, events) {
                warn!(
                    "Skipping {} '{}' under {} '{}': {}",
                    child_kind, child_name, kind, id, e
                );
            }
        }
        Ok(id)
    }

    fn remove(&mut self, id: ConfigId, events: &mut Vec<ConfiguratorEvent>) -> Result<()> {
        if id == self.root {
            return Err(PubSubError::InvalidArgument(
                "the configuration root cannot be removed".into(),
            ));
        }
        let node = self.node(id)?;
        let children = node.children.clone();
        let referencing = match &node.object {
            ConfigObject::PublishedDataSet(pds) => self.writers_of_data_set(&pds.name),
            _ => Vec::new(),
        };

        for child in children {
            self.remove(child, events)?;
        }
        for writer in referencing {
            if self.nodes.contains_key(&writer) {
                self.remove(writer, events)?;
            }
        }

        let node = self.nodes.remove(&id).ok_or(PubSubError::NodeIdUnknown(id))?;
        if let Some(parent) = self.nodes.get_mut(&node.parent) {
            parent.children.retain(|child| *child != id);
        }
        debug!("Removed {} '{}' (id {})", node.object.kind(), node.object.name(), id);
        events.push(ConfiguratorEvent::Removed {
            id,
            parent_id: node.parent,
            object: node.object,
        });
        Ok(())
    }

    fn writers_of_data_set(&self, data_set_name: &str) -> Vec<ConfigId> {
        let mut writers: Vec<ConfigId> = self
            .nodes
            .iter()
            .filter_map(|(id, node)| match &node.object {
                ConfigObject::DataSetWriter(w) if w.data_set_name == data_set_name => Some(*id),
                _ => None,
            })
            .collect();
        writers.sort();
        writers
    }

    fn set_state(
        &mut self,
        id: ConfigId,
        new_state: PubSubState,
        events: &mut Vec<ConfiguratorEvent>,
    ) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        let old_state = node.state;
        if old_state == new_state {
            return;
        }
        node.state = new_state;
        if let Some(e) = node.object.as_enableable_mut() {
            e.set_enabled(new_state.is_enabled());
        }
        let kind = node.object.kind();
        let children = node.children.clone();
        debug!("{} {} state {} -> {}", kind, id, old_state, new_state);
        events.push(ConfiguratorEvent::StateChanged {
            id,
            kind,
            old_state,
            new_state,
        });

        for child in children {
            let Some(child_node) = self.nodes.get(&child) else {
                continue;
            };
            if child_node.object.as_enableable().is_none() {
                continue;
            }
            if let Some(next) = child_node.state.follow_parent(new_state) {
                self.set_state(child, next, events);
            }
        }
    }

    fn enableable(&self, id: ConfigId) -> Result<&ConfigNode> {
        let node = self.node(id)?;
        if node.object.as_enableable().is_none() {
            return Err(PubSubError::InvalidState(format!(
                "{} {} cannot be enabled or disabled",
                node.object.kind(),
                id
            )));
        }
        Ok(node)
    }

    fn enable(&mut self, id: ConfigId, events: &mut Vec<ConfiguratorEvent>) -> Result<()> {
        let node = self.enableable(id)?;
        if node.state != PubSubState::Disabled {
            return Err(PubSubError::InvalidState(format!(
                "{} {} is {}, expected Disabled",
                node.object.kind(),
                id,
                node.state
            )));
        }
        let parent_state = self
            .nodes
            .get(&node.parent)
            .map_or(PubSubState::Operational, |p| p.state);
        let new_state = if parent_state == PubSubState::Operational {
            PubSubState::Operational
        } else {
            PubSubState::Paused
        };
        self.set_state(id, new_state, events);
        Ok(())
    }

    fn disable(&mut self, id: ConfigId, events: &mut Vec<ConfiguratorEvent>) -> Result<()> {
        let node = self.enableable(id)?;
        if node.state == PubSubState::Disabled {
            return Err(PubSubError::InvalidState(format!(
                "{} {} is already Disabled",
                node.object.kind(),
                id
            )));
        }
        self.set_state(id, PubSubState::Disabled, events);
        Ok(())
    }

    /// Object with its descendants put back into its native collections.
    fn assemble(&self, id: ConfigId) -> Option<ConfigObject> {
        let node = self.nodes.get(&id)?;
        let mut object = node.object.clone();
        for child in &node.children {
            if let Some(child) = self.assemble(*child) {
                object.push_child(child);
            }
        }
        Some(object)
    }
}

// ============================================================================
// Configurator
// ============================================================================

/// Thread-safe owner of the PubSub configuration tree.
pub struct PubSubConfigurator {
    tree: Mutex<ConfigTree>,
    listeners: RwLock<Vec<Arc<dyn ConfiguratorListener>>>,
}

impl Default for PubSubConfigurator {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSubConfigurator {
    /// Empty configuration; the root is registered and Operational.
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(ConfigTree::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn ConfiguratorListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn ConfiguratorListener>) {
        self.listeners.write().retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Run `f` under the tree lock, then deliver the events it collected.
    ///
    /// A panic in `f` or in a listener is logged and reported as
    /// `InvalidArgument`; changes made before it stay applied and are still
    /// delivered.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut ConfigTree, &mut Vec<ConfiguratorEvent>) -> Result<T>,
    ) -> Result<T> {
        let mut events = Vec::new();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut tree = self.tree.lock();
            f(&mut tree, &mut events)
        }))
        .unwrap_or_else(|_| {
            error!("Configuration change panicked");
            Err(PubSubError::InvalidArgument(
                "configuration change panicked".into(),
            ))
        });

        let failed = self.dispatch(&events);
        match result {
            Ok(_) if failed > 0 => Err(PubSubError::InvalidArgument(format!(
                "{} configuration listeners panicked",
                failed
            ))),
            result => result,
        }
    }

    /// Returns the number of listener calls that panicked.
    fn dispatch(&self, events: &[ConfiguratorEvent]) -> usize {
        if events.is_empty() {
            return 0;
        }
        let listeners = self.listeners.read().clone();
        let mut failed = 0;
        for event in events {
            for listener in &listeners {
                let delivered =
                    catch_unwind(AssertUnwindSafe(|| listener.on_configurator_event(event)));
                if delivered.is_err() {
                    failed += 1;
                    error!("Configurator listener panicked while handling {:?}", event);
                }
            }
        }
        failed
    }

    /// Id of the configuration root.
    pub fn pub_sub_configuration_id(&self) -> ConfigId {
        self.tree.lock().root
    }

    /// Load `config` into the tree.
    ///
    /// With `replace_existing` every PublishedDataSet and Connection is removed
    /// first and the root's enabled flag is taken from `config`. Datasets are
    /// added before connections. Children that cannot be added are logged and
    /// skipped.
    pub fn load_configuration(
        &self,
        mut config: PubSubConfiguration,
        replace_existing: bool,
    ) -> Result<()> {
        self.mutate(|tree, events| {
            let root = tree.root;
            if replace_existing {
                let existing = tree.node(root)?.children.clone();
                let (data_sets, connections): (Vec<ConfigId>, Vec<ConfigId>) =
                    existing.into_iter().partition(|id| {
                        tree.nodes
                            .get(id)
                            .is_some_and(|n| n.object.kind() == ConfigKind::PublishedDataSet)
                    });
                for id in data_sets.into_iter().chain(connections) {
                    if tree.nodes.contains_key(&id) {
                        tree.remove(id, events)?;
                    }
                }

                let root_state = tree.node(root)?.state;
                if config.enabled && root_state == PubSubState::Disabled {
                    tree.enable(root, events)?;
                } else if !config.enabled && root_state != PubSubState::Disabled {
                    tree.disable(root, events)?;
                }
            }

            let data_sets = std::mem::take(&mut config.published_data_sets);
            let connections = std::mem::take(&mut config.connections);
            let children = data_sets
                .into_iter()
                .map(ConfigObject::PublishedDataSet)
                .chain(connections.into_iter().map(ConfigObject::Connection));
            for child in children {
                let kind = child.kind();
                let name = child.name().to_string();
                if let Err(e) = tree.add(root, child, events) {
                    warn!("Skipping {} '{}' while loading configuration: {}", kind, name, e);
                }
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Add
    // ------------------------------------------------------------------------

    /// Add any object under `parent_id`; the parent must be of the object's parent kind.
    pub fn add(&self, parent_id: ConfigId, object: ConfigObject) -> Result<ConfigId> {
        self.mutate(|tree, events| tree.add(parent_id, object, events))
    }

    pub fn add_published_data_set(&self, data_set: PublishedDataSetDataType) -> Result<ConfigId> {
        let root = self.pub_sub_configuration_id();
        self.add(root, ConfigObject::PublishedDataSet(data_set))
    }

    pub fn add_extension_field(
        &self,
        published_data_set_id: ConfigId,
        field: KeyValuePair,
    ) -> Result<ConfigId> {
        self.add(published_data_set_id, ConfigObject::ExtensionField(field))
    }

    pub fn add_connection(&self, connection: PubSubConnectionDataType) -> Result<ConfigId> {
        let root = self.pub_sub_configuration_id();
        self.add(root, ConfigObject::Connection(connection))
    }

    pub fn add_writer_group(
        &self,
        connection_id: ConfigId,
        group: WriterGroupDataType,
    ) -> Result<ConfigId> {
        self.add(connection_id, ConfigObject::WriterGroup(group))
    }

    pub fn add_data_set_writer(
        &self,
        writer_group_id: ConfigId,
        writer: DataSetWriterDataType,
    ) -> Result<ConfigId> {
        self.add(writer_group_id, ConfigObject::DataSetWriter(writer))
    }

    pub fn add_reader_group(
        &self,
        connection_id: ConfigId,
        group: ReaderGroupDataType,
    ) -> Result<ConfigId> {
        self.add(connection_id, ConfigObject::ReaderGroup(group))
    }

    pub fn add_data_set_reader(
        &self,
        reader_group_id: ConfigId,
        reader: DataSetReaderDataType,
    ) -> Result<ConfigId> {
        self.add(reader_group_id, ConfigObject::DataSetReader(reader))
    }

    // ------------------------------------------------------------------------
    // Remove
    // ------------------------------------------------------------------------

    /// Remove an object and its descendants. Removing a PublishedDataSet also
    /// removes every DataSetWriter that references it by name.
    pub fn remove(&self, id: ConfigId) -> Result<()> {
        self.mutate(|tree, events| tree.remove(id, events))
    }

    fn remove_kind(&self, id: ConfigId, kind: ConfigKind) -> Result<()> {
        self.mutate(|tree, events| {
            tree.node_of_kind(id, kind)?;
            tree.remove(id, events)
        })
    }

    pub fn remove_published_data_set(&self, id: ConfigId) -> Result<()> {
        self.remove_kind(id, ConfigKind::PublishedDataSet)
    }

    pub fn remove_extension_field(&self, id: ConfigId) -> Result<()> {
        self.remove_kind(id, ConfigKind::ExtensionField)
    }

    pub fn remove_connection(&self, id: ConfigId) -> Result<()> {
        self.remove_kind(id, ConfigKind::Connection)
    }

    pub fn remove_writer_group(&self, id: ConfigId) -> Result<()> {
        self.remove_kind(id, ConfigKind::WriterGroup)
    }

    pub fn remove_data_set_writer(&self, id: ConfigId) -> Result<()> {
        self.remove_kind(id, ConfigKind::DataSetWriter)
    }

    pub fn remove_reader_group(&self, id: ConfigId) -> Result<()> {
        self.remove_kind(id, ConfigKind::ReaderGroup)
    }

    pub fn remove_data_set_reader(&self, id: ConfigId) -> Result<()> {
        self.remove_kind(id, ConfigKind::DataSetReader)
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    /// Move a Disabled object to Operational (or Paused under a non-operational parent).
    pub fn enable(&self, id: ConfigId) -> Result<()> {
        self.mutate(|tree, events| tree.enable(id, events))
    }

    /// Move an enabled object to Disabled; its children become Paused.
    pub fn disable(&self, id: ConfigId) -> Result<()> {
        self.mutate(|tree, events| tree.disable(id, events))
    }

    /// Replace the cached metadata of a DataSetReader.
    pub fn update_data_set_reader_meta_data(
        &self,
        reader_id: ConfigId,
        meta_data: DataSetMetaData,
    ) -> Result<()> {
        let mut tree = self.tree.lock();
        tree.node_of_kind(reader_id, ConfigKind::DataSetReader)?;
        if let Some(ConfigNode {
            object: ConfigObject::DataSetReader(reader),
            ..
        }) = tree.nodes.get_mut(&reader_id)
        {
            debug!(
                "DataSetReader '{}' metadata now at version {}.{}",
                reader.name,
                meta_data.configuration_version.major_version,
                meta_data.configuration_version.minor_version
            );
            reader.data_set_meta_data = Some(meta_data);
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------------

    /// Object registered under `id`, without its children.
    pub fn find_object_by_id(&self, id: ConfigId) -> Option<ConfigObject> {
        self.tree.lock().nodes.get(&id).map(|n| n.object.clone())
    }

    /// `PubSubState::Error` when `id` is unknown.
    pub fn find_state_for_id(&self, id: ConfigId) -> PubSubState {
        self.tree
            .lock()
            .nodes
            .get(&id)
            .map_or(PubSubState::Error, |n| n.state)
    }

    /// `ConfigId::INVALID` when `id` is unknown or the root.
    pub fn find_parent_id(&self, id: ConfigId) -> ConfigId {
        self.tree
            .lock()
            .nodes
            .get(&id)
            .map_or(ConfigId::INVALID, |n| n.parent)
    }

    /// Child ids in insertion order; empty when `id` is unknown.
    pub fn find_children_ids(&self, id: ConfigId) -> Vec<ConfigId> {
        self.tree
            .lock()
            .nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Id of the child of `parent` with the given kind and name.
    pub fn find_id_by_name(&self, parent: ConfigId, kind: ConfigKind, name: &str) -> ConfigId {
        self.tree
            .lock()
            .find_child(parent, kind, name)
            .unwrap_or(ConfigId::INVALID)
    }

    pub fn kind_of(&self, id: ConfigId) -> Option<ConfigKind> {
        self.tree.lock().nodes.get(&id).map(|n| n.object.kind())
    }

    /// Number of registered objects, root included.
    pub fn len(&self) -> usize {
        self.tree.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    // ------------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------------

    /// Full configuration assembled from the tree.
    pub fn configuration(&self) -> PubSubConfiguration {
        let tree = self.tree.lock();
        match tree.assemble(tree.root) {
            Some(ConfigObject::PubSubConfiguration(config)) => config,
            _ => PubSubConfiguration::default(),
        }
    }

    /// Object under `id` with all of its descendants.
    pub fn snapshot(&self, id: ConfigId) -> Option<ConfigObject> {
        self.tree.lock().assemble(id)
    }

    pub fn connection(&self, id: ConfigId) -> Option<PubSubConnectionDataType> {
        match self.snapshot(id)? {
            ConfigObject::Connection(connection) => Some(connection),
            _ => None,
        }
    }

    pub fn writer_group(&self, id: ConfigId) -> Option<WriterGroupDataType> {
        match self.snapshot(id)? {
            ConfigObject::WriterGroup(group) => Some(group),
            _ => None,
        }
    }

    /// PublishedDataSet with its extension fields, looked up by name.
    pub fn published_data_set_by_name(
        &self,
        name: &str,
    ) -> Option<(ConfigId, PublishedDataSetDataType)> {
        let tree = self.tree.lock();
        let id = tree.find_child(tree.root, ConfigKind::PublishedDataSet, name)?;
        match tree.assemble(id)? {
            ConfigObject::PublishedDataSet(pds) => Some((id, pds)),
            _ => None,
        }
    }

    /// Ids of the direct children of `parent` with the given kind.
    pub fn children_of_kind(&self, parent: ConfigId, kind: ConfigKind) -> Vec<ConfigId> {
        let tree = self.tree.lock();
        tree.nodes.get(&parent).map_or_else(Vec::new, |n| {
            n.children
                .iter()
                .copied()
                .filter(|child| {
                    tree.nodes
                        .get(child)
                        .is_some_and(|c| c.object.kind() == kind)
                })
                .collect()
        })
    }

    /// Every DataSetReader below a connection, with its reader group id.
    pub fn data_set_readers_of_connection(
        &self,
        connection_id: ConfigId,
    ) -> Vec<(ConfigId, ConfigId, DataSetReaderDataType)> {
        let tree = self.tree.lock();
        let Some(connection) = tree.nodes.get(&connection_id) else {
            return Vec::new();
        };
        let mut readers = Vec::new();
        for group_id in &connection.children {
            let Some(group) = tree.nodes.get(group_id) else {
                continue;
            };
            if group.object.kind() != ConfigKind::ReaderGroup {
                continue;
            }
            for reader_id in &group.children {
                if let Some(ConfigNode {
                    object: ConfigObject::DataSetReader(reader),
                    ..
                }) = tree.nodes.get(reader_id)
                {
                    readers.push((*group_id, *reader_id, reader.clone()));
                }
            }
        }
        readers
    }
}
