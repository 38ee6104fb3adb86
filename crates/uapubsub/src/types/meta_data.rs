// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DataSet metadata: field schema plus the configuration version that
//! subscribers use to detect schema changes.

use super::variant::Variant;
use serde::{Deserialize, Serialize};

/// OPC UA built-in type identifiers (Part 6, 5.1.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BuiltInType {
    #[default]
    Null,
    Boolean,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float,
    Double,
    String,
    DateTime,
    Guid,
    ByteString,
    XmlElement,
    NodeId,
    ExpandedNodeId,
    StatusCode,
    QualifiedName,
    LocalizedText,
    ExtensionObject,
    DataValue,
    Variant,
    DiagnosticInfo,
}

/// Major/minor version pair of a DataSet's metadata.
///
/// Both halves are "version times": seconds since 2000-01-01 00:00:00 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConfigurationVersion {
    pub major_version: u32,
    pub minor_version: u32,
}

impl ConfigurationVersion {
    pub fn new(major_version: u32, minor_version: u32) -> Self {
        Self {
            major_version,
            minor_version,
        }
    }
}

/// Named value, used for field properties, connection properties and
/// PublishedDataSet extension fields.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    #[serde(default)]
    pub value: Variant,
}

impl KeyValuePair {
    pub fn new(key: impl Into<String>, value: impl Into<Variant>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Schema of a single DataSet field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMetaData {
    pub name: String,
    pub description: String,
    pub field_flags: u16,
    pub built_in_type: BuiltInType,
    /// Textual NodeId of the data type, e.g. `i=11`.
    pub data_type: String,
    /// -1 scalar, 1 one-dimensional array, ...
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
    pub max_string_length: u32,
    pub properties: Vec<KeyValuePair>,
}

impl Default for FieldMetaData {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            field_flags: 0,
            built_in_type: BuiltInType::Null,
            data_type: String::new(),
            value_rank: -1,
            array_dimensions: Vec::new(),
            max_string_length: 0,
            properties: Vec::new(),
        }
    }
}

impl FieldMetaData {
    /// Scalar field of the given built-in type.
    pub fn scalar(name: impl Into<String>, built_in_type: BuiltInType) -> Self {
        Self {
            name: name.into(),
            built_in_type,
            ..Self::default()
        }
    }
}

/// Schema of a whole DataSet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSetMetaData {
    pub name: String,
    pub description: String,
    pub fields: Vec<FieldMetaData>,
    pub configuration_version: ConfigurationVersion,
}

impl DataSetMetaData {
    pub fn new(name: impl Into<String>, fields: Vec<FieldMetaData>) -> Self {
        Self {
            name: name.into(),
            fields,
            ..Self::default()
        }
    }
}
