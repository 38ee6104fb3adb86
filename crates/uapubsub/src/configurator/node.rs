// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Arena records of the configuration tree.

use super::state::PubSubState;
use crate::types::{
    DataSetReaderDataType, DataSetWriterDataType, Enableable, KeyValuePair,
    PubSubConfiguration, PubSubConnectionDataType, PublishedDataSetDataType,
    ReaderGroupDataType, WriterGroupDataType,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_CONFIG_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique handle of a configuration object. `0` is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigId(pub u32);

impl ConfigId {
    pub const INVALID: Self = Self(0);

    pub(crate) fn next() -> Self {
        Self(NEXT_CONFIG_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a configuration object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigKind {
    PubSubConfiguration,
    Connection,
    WriterGroup,
    DataSetWriter,
    ReaderGroup,
    DataSetReader,
    PublishedDataSet,
    ExtensionField,
}

impl ConfigKind {
    /// Kind of the only legal parent, `None` for the root.
    pub fn parent_kind(self) -> Option<ConfigKind> {
        match self {
            Self::PubSubConfiguration => None,
            Self::Connection | Self::PublishedDataSet => Some(Self::PubSubConfiguration),
            Self::WriterGroup | Self::ReaderGroup => Some(Self::Connection),
            Self::DataSetWriter => Some(Self::WriterGroup),
            Self::DataSetReader => Some(Self::ReaderGroup),
            Self::ExtensionField => Some(Self::PublishedDataSet),
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PubSubConfiguration => "PubSubConfiguration",
            Self::Connection => "Connection",
            Self::WriterGroup => "WriterGroup",
            Self::DataSetWriter => "DataSetWriter",
            Self::ReaderGroup => "ReaderGroup",
            Self::DataSetReader => "DataSetReader",
            Self::PublishedDataSet => "PublishedDataSet",
            Self::ExtensionField => "ExtensionField",
        };
        f.write_str(name)
    }
}

/// A configuration object of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigObject {
    PubSubConfiguration(PubSubConfiguration),
    Connection(PubSubConnectionDataType),
    WriterGroup(WriterGroupDataType),
    DataSetWriter(DataSetWriterDataType),
    ReaderGroup(ReaderGroupDataType),
    DataSetReader(DataSetReaderDataType),
    PublishedDataSet(PublishedDataSetDataType),
    ExtensionField(KeyValuePair),
}

impl ConfigObject {
    pub fn kind(&self) -> ConfigKind {
        match self {
            Self::PubSubConfiguration(_) => ConfigKind::PubSubConfiguration,
            Self::Connection(_) => ConfigKind::Connection,
            Self::WriterGroup(_) => ConfigKind::WriterGroup,
            Self::DataSetWriter(_) => ConfigKind::DataSetWriter,
            Self::ReaderGroup(_) => ConfigKind::ReaderGroup,
            Self::DataSetReader(_) => ConfigKind::DataSetReader,
            Self::PublishedDataSet(_) => ConfigKind::PublishedDataSet,
            Self::ExtensionField(_) => ConfigKind::ExtensionField,
        }
    }

    /// Browse name; the root has none.
    pub fn name(&self) -> &str {
        match self {
            Self::PubSubConfiguration(_) => "",
            Self::Connection(c) => &c.name,
            Self::WriterGroup(g) => &g.name,
            Self::DataSetWriter(w) => &w.name,
            Self::ReaderGroup(g) => &g.name,
            Self::DataSetReader(r) => &r.name,
            Self::PublishedDataSet(p) => &p.name,
            Self::ExtensionField(f) => &f.key,
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            Self::PubSubConfiguration(_) => {}
            Self::Connection(c) => c.name = name,
            Self::WriterGroup(g) => g.name = name,
            Self::DataSetWriter(w) => w.name = name,
            Self::ReaderGroup(g) => g.name = name,
            Self::DataSetReader(r) => r.name = name,
            Self::PublishedDataSet(p) => p.name = name,
            Self::ExtensionField(f) => f.key = name,
        }
    }

    /// `None` for objects without an enabled flag.
    pub fn as_enableable(&self) -> Option<&dyn Enableable> {
        match self {
            Self::PubSubConfiguration(c) => Some(c),
            Self::Connection(c) => Some(c),
            Self::WriterGroup(g) => Some(g),
            Self::DataSetWriter(w) => Some(w),
            Self::ReaderGroup(g) => Some(g),
            Self::DataSetReader(r) => Some(r),
            Self::PublishedDataSet(_) | Self::ExtensionField(_) => None,
        }
    }

    pub fn as_enableable_mut(&mut self) -> Option<&mut dyn Enableable> {
        match self {
            Self::PubSubConfiguration(c) => Some(c),
            Self::Connection(c) => Some(c),
            Self::WriterGroup(g) => Some(g),
            Self::DataSetWriter(w) => Some(w),
            Self::ReaderGroup(g) => Some(g),
            Self::DataSetReader(r) => Some(r),
            Self::PublishedDataSet(_) | Self::ExtensionField(_) => None,
        }
    }

    /// Strip the pre-populated child collections, returned in insertion order.
    pub(crate) fn take_children(&mut self) -> Vec<ConfigObject> {
        match self {
            Self::PubSubConfiguration(c) => std::mem::take(&mut c.published_data_sets)
                .into_iter()
                .map(Self::PublishedDataSet)
                .chain(std::mem::take(&mut c.connections).into_iter().map(Self::Connection))
                .collect(),
            Self::Connection(c) => std::mem::take(&mut c.writer_groups)
                .into_iter()
                .map(Self::WriterGroup)
                .chain(std::mem::take(&mut c.reader_groups).into_iter().map(Self::ReaderGroup))
                .collect(),
            Self::WriterGroup(g) => std::mem::take(&mut g.data_set_writers)
                .into_iter()
                .map(Self::DataSetWriter)
                .collect(),
            Self::ReaderGroup(g) => std::mem::take(&mut g.data_set_readers)
                .into_iter()
                .map(Self::DataSetReader)
                .collect(),
            Self::PublishedDataSet(p) => std::mem::take(&mut p.extension_fields)
                .into_iter()
                .map(Self::ExtensionField)
                .collect(),
            Self::DataSetWriter(_) | Self::DataSetReader(_) | Self::ExtensionField(_) => {
                Vec::new()
            }
        }
    }

    /// Put an assembled child back into this object's native collection.
    pub(crate) fn push_child(&mut self, child: ConfigObject) {
        match (self, child) {
            (Self::PubSubConfiguration(c), Self::PublishedDataSet(p)) => {
                c.published_data_sets.push(p);
            }
            (Self::PubSubConfiguration(c), Self::Connection(conn)) => c.connections.push(conn),
            (Self::Connection(c), Self::WriterGroup(g)) => c.writer_groups.push(g),
            (Self::Connection(c), Self::ReaderGroup(g)) => c.reader_groups.push(g),
            (Self::WriterGroup(g), Self::DataSetWriter(w)) => g.data_set_writers.push(w),
            (Self::ReaderGroup(g), Self::DataSetReader(r)) => g.data_set_readers.push(r),
            (Self::PublishedDataSet(p), Self::ExtensionField(f)) => p.extension_fields.push(f),
            (parent, child) => {
                tracing::warn!(
                    "Ignoring {} assembled under a {}",
                    child.kind(),
                    parent.kind()
                );
            }
        }
    }
}

/// One record of the configuration arena.
#[derive(Debug, Clone)]
pub(crate) struct ConfigNode {
    /// Object with its child collections stripped.
    pub object: ConfigObject,
    pub parent: ConfigId,
    pub state: PubSubState,
    pub children: Vec<ConfigId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_valid() {
        let a = ConfigId::next();
        let b = ConfigId::next();
        assert!(a.is_valid());
        assert!(b.is_valid());
        assert_ne!(a, b);
    }

    #[test]
    fn test_take_and_push_children() {
        let mut group = WriterGroupDataType::new("g", 1, 100.0);
        group
            .data_set_writers
            .push(DataSetWriterDataType::new("w1", 1, "ds"));
        group
            .data_set_writers
            .push(DataSetWriterDataType::new("w2", 2, "ds"));
        let mut object = ConfigObject::WriterGroup(group);

        let children = object.take_children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].name(), "w2");

        for child in children {
            object.push_child(child);
        }
        match object {
            ConfigObject::WriterGroup(g) => assert_eq!(g.data_set_writers.len(), 2),
            other => panic!("unexpected object {:?}", other.kind()),
        }
    }

    #[test]
    fn test_parent_kinds() {
        assert_eq!(ConfigKind::PubSubConfiguration.parent_kind(), None);
        assert_eq!(
            ConfigKind::DataSetReader.parent_kind(),
            Some(ConfigKind::ReaderGroup)
        );
        assert_eq!(
            ConfigKind::ExtensionField.parent_kind(),
            Some(ConfigKind::PublishedDataSet)
        );
    }
}
