// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PubSub configuration data types (Part 14, 6.2).
//!
//! ```text
//! PubSubConfiguration
//! +-- PublishedDataSet*  --> ExtensionField*
//! +-- Connection*
//!     +-- WriterGroup*   --> DataSetWriter*
//!     +-- ReaderGroup*   --> DataSetReader*
//! ```
//!
//! These are plain values. Once loaded into a
//! [`PubSubConfigurator`](crate::configurator::PubSubConfigurator) the tree
//! is owned by the configurator and the child collections below are only
//! used to carry pre-populated children in and assembled snapshots out.

use super::content_mask::{
    DataSetFieldContentMask, DataSetMessageContentMask, NetworkMessageContentMask,
};
use super::meta_data::{DataSetMetaData, KeyValuePair};
use super::transport_profile::UDP_UADP_PROFILE_URI;
use super::variant::Variant;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute id of the Value attribute.
pub const VALUE_ATTRIBUTE_ID: u32 = 13;

/// Capability shared by every configuration object with an `enabled` flag.
pub trait Enableable {
    fn enabled(&self) -> bool;
    fn set_enabled(&mut self, enabled: bool);
}

macro_rules! impl_enableable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Enableable for $ty {
                fn enabled(&self) -> bool {
                    self.enabled
                }

                fn set_enabled(&mut self, enabled: bool) {
                    self.enabled = enabled;
                }
            }
        )*
    };
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a publisher. `Null` on a reader means "any publisher".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PublisherId {
    #[default]
    Null,
    Byte(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    String(String),
}

impl PublisherId {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Byte(v) => Some(u64::from(*v)),
            Self::UInt16(v) => Some(u64::from(*v)),
            Self::UInt32(v) => Some(u64::from(*v)),
            Self::UInt64(v) => Some(*v),
            Self::Null | Self::String(_) => None,
        }
    }

    /// Whether `other` satisfies this id used as a filter.
    ///
    /// Numeric ids compare by value regardless of width.
    pub fn matches(&self, other: &PublisherId) -> bool {
        match (self, other) {
            (Self::Null, _) => true,
            (Self::String(a), Self::String(b)) => a == b,
            _ => match (self.as_u64(), other.as_u64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for PublisherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("<null>"),
            Self::Byte(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root of the configuration tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PubSubConfiguration {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub published_data_sets: Vec<PublishedDataSetDataType>,
    #[serde(default)]
    pub connections: Vec<PubSubConnectionDataType>,
}

impl Default for PubSubConfiguration {
    fn default() -> Self {
        Self {
            enabled: true,
            published_data_sets: Vec::new(),
            connections: Vec::new(),
        }
    }
}

// ============================================================================
// Published data sets
// ============================================================================

/// One published node attribute, the source of one DataSet field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedVariable {
    /// Textual NodeId of the published node.
    pub published_variable: String,
    #[serde(default = "default_value_attribute")]
    pub attribute_id: u32,
    /// Value published while the source has no good value.
    #[serde(default)]
    pub substitute_value: Variant,
}

fn default_value_attribute() -> u32 {
    VALUE_ATTRIBUTE_ID
}

impl PublishedVariable {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            published_variable: node_id.into(),
            attribute_id: VALUE_ATTRIBUTE_ID,
            substitute_value: Variant::Null,
        }
    }

    pub fn with_substitute(mut self, value: impl Into<Variant>) -> Self {
        self.substitute_value = value.into();
        self
    }
}

/// Named, versioned collection of published fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishedDataSetDataType {
    pub name: String,
    pub data_set_folder: Vec<String>,
    pub data_set_meta_data: DataSetMetaData,
    pub extension_fields: Vec<KeyValuePair>,
    /// Published variables, positionally matching `data_set_meta_data.fields`.
    pub published_data: Vec<PublishedVariable>,
}

impl PublishedDataSetDataType {
    pub fn new(name: impl Into<String>, data_set_meta_data: DataSetMetaData) -> Self {
        Self {
            name: name.into(),
            data_set_meta_data,
            ..Self::default()
        }
    }
}

// ============================================================================
// Connections
// ============================================================================

/// Transport address of a connection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkAddress {
    pub url: String,
    pub network_interface: String,
}

/// One transport connection with its writer and reader groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubSubConnectionDataType {
    pub name: String,
    pub enabled: bool,
    pub publisher_id: PublisherId,
    pub transport_profile_uri: String,
    pub address: NetworkAddress,
    pub connection_properties: Vec<KeyValuePair>,
    pub writer_groups: Vec<WriterGroupDataType>,
    pub reader_groups: Vec<ReaderGroupDataType>,
}

impl Default for PubSubConnectionDataType {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            publisher_id: PublisherId::Null,
            transport_profile_uri: UDP_UADP_PROFILE_URI.to_string(),
            address: NetworkAddress::default(),
            connection_properties: Vec::new(),
            writer_groups: Vec::new(),
            reader_groups: Vec::new(),
        }
    }
}

impl PubSubConnectionDataType {
    pub fn new(name: impl Into<String>, transport_profile_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transport_profile_uri: transport_profile_uri.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Writer side
// ============================================================================

/// Group of writers sharing a publishing interval and network message layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterGroupDataType {
    pub name: String,
    pub enabled: bool,
    pub writer_group_id: u16,
    /// Milliseconds.
    pub publishing_interval: f64,
    /// Milliseconds.
    pub keep_alive_time: f64,
    pub priority: u8,
    pub max_network_message_size: u32,
    pub network_message_content_mask: NetworkMessageContentMask,
    pub data_set_writers: Vec<DataSetWriterDataType>,
}

impl Default for WriterGroupDataType {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            writer_group_id: 0,
            publishing_interval: 1000.0,
            keep_alive_time: 5000.0,
            priority: 0,
            max_network_message_size: 1500,
            network_message_content_mask: NetworkMessageContentMask::uadp_default(),
            data_set_writers: Vec::new(),
        }
    }
}

impl WriterGroupDataType {
    pub fn new(name: impl Into<String>, writer_group_id: u16, publishing_interval: f64) -> Self {
        Self {
            name: name.into(),
            writer_group_id,
            publishing_interval,
            ..Self::default()
        }
    }
}

/// Writer of one PublishedDataSet, referenced by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSetWriterDataType {
    pub name: String,
    pub enabled: bool,
    pub data_set_writer_id: u16,
    pub data_set_field_content_mask: DataSetFieldContentMask,
    pub data_set_message_content_mask: DataSetMessageContentMask,
    /// Every Nth message is a key frame; 0 and 1 mean key frames only.
    pub key_frame_count: u32,
    pub data_set_name: String,
    /// Milliseconds between periodic metadata messages; 0 sends on change only.
    pub meta_data_update_time: f64,
}

impl Default for DataSetWriterDataType {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            data_set_writer_id: 0,
            data_set_field_content_mask: DataSetFieldContentMask::empty(),
            data_set_message_content_mask: DataSetMessageContentMask::uadp_default(),
            key_frame_count: 1,
            data_set_name: String::new(),
            meta_data_update_time: 0.0,
        }
    }
}

impl DataSetWriterDataType {
    pub fn new(
        name: impl Into<String>,
        data_set_writer_id: u16,
        data_set_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_set_writer_id,
            data_set_name: data_set_name.into(),
            ..Self::default()
        }
    }

    pub fn with_key_frame_count(mut self, key_frame_count: u32) -> Self {
        self.key_frame_count = key_frame_count;
        self
    }
}

// ============================================================================
// Reader side
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderGroupDataType {
    pub name: String,
    pub enabled: bool,
    pub data_set_readers: Vec<DataSetReaderDataType>,
}

impl Default for ReaderGroupDataType {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            data_set_readers: Vec::new(),
        }
    }
}

impl ReaderGroupDataType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Subscriber-side filter and metadata cache for one writer's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSetReaderDataType {
    pub name: String,
    pub enabled: bool,
    /// `Null` accepts any publisher.
    pub publisher_id: PublisherId,
    /// 0 accepts any writer group.
    pub writer_group_id: u16,
    /// 0 accepts any writer.
    pub data_set_writer_id: u16,
    pub data_set_field_content_mask: DataSetFieldContentMask,
    /// Milliseconds.
    pub message_receive_timeout: f64,
    pub data_set_meta_data: Option<DataSetMetaData>,
}

impl Default for DataSetReaderDataType {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            publisher_id: PublisherId::Null,
            writer_group_id: 0,
            data_set_writer_id: 0,
            data_set_field_content_mask: DataSetFieldContentMask::empty(),
            message_receive_timeout: 0.0,
            data_set_meta_data: None,
        }
    }
}

impl DataSetReaderDataType {
    pub fn new(
        name: impl Into<String>,
        publisher_id: PublisherId,
        writer_group_id: u16,
        data_set_writer_id: u16,
    ) -> Self {
        Self {
            name: name.into(),
            publisher_id,
            writer_group_id,
            data_set_writer_id,
            ..Self::default()
        }
    }

    /// Whether a DataSetMessage with these identifiers is meant for this reader.
    pub fn matches(
        &self,
        publisher_id: &PublisherId,
        writer_group_id: u16,
        data_set_writer_id: u16,
    ) -> bool {
        self.publisher_id.matches(publisher_id)
            && (self.writer_group_id == 0 || self.writer_group_id == writer_group_id)
            && (self.data_set_writer_id == 0 || self.data_set_writer_id == data_set_writer_id)
    }
}

impl_enableable!(
    PubSubConfiguration,
    PubSubConnectionDataType,
    WriterGroupDataType,
    DataSetWriterDataType,
    ReaderGroupDataType,
    DataSetReaderDataType,
);

// ============================================================================
// Discovery
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MessageSecurityMode {
    #[default]
    None,
    Sign,
    SignAndEncrypt,
}

/// Server endpoint advertised in publisher endpoint discovery responses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointDescription {
    pub endpoint_url: String,
    pub security_mode: MessageSecurityMode,
    pub security_policy_uri: String,
    pub transport_profile_uri: String,
}

impl EndpointDescription {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            security_policy_uri: "http://opcfoundation.org/UA/SecurityPolicy#None".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_id_numeric_match_across_widths() {
        assert!(PublisherId::UInt16(10).matches(&PublisherId::UInt64(10)));
        assert!(PublisherId::Byte(7).matches(&PublisherId::UInt32(7)));
        assert!(!PublisherId::UInt16(10).matches(&PublisherId::UInt16(11)));
    }

    #[test]
    fn test_publisher_id_null_is_wildcard() {
        assert!(PublisherId::Null.matches(&PublisherId::String("plc-1".into())));
        assert!(!PublisherId::String("plc-1".into()).matches(&PublisherId::Null));
        assert!(!PublisherId::String("10".into()).matches(&PublisherId::UInt16(10)));
    }

    #[test]
    fn test_reader_matching_wildcards() {
        let reader = DataSetReaderDataType::new("r", PublisherId::UInt16(1), 0, 5);
        assert!(reader.matches(&PublisherId::UInt16(1), 99, 5));
        assert!(!reader.matches(&PublisherId::UInt16(1), 99, 6));
        assert!(!reader.matches(&PublisherId::UInt16(2), 99, 5));

        let any = DataSetReaderDataType::new("any", PublisherId::Null, 0, 0);
        assert!(any.matches(&PublisherId::String("x".into()), 1, 1));
    }

    #[test]
    fn test_enableable_roundtrip() {
        let mut writer = DataSetWriterDataType::new("w", 1, "ds");
        assert!(writer.enabled());
        writer.set_enabled(false);
        assert!(!writer.enabled);
    }
}
