// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DataSetMessage: one writer's DataSet inside a network message.

use crate::data_set::DataSet;
use crate::types::{
    ConfigurationVersion, DataSetFieldContentMask, DataSetMessageContentMask,
    DataSetWriterDataType, StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of DataSetMessage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataSetMessageType {
    /// All fields.
    #[default]
    KeyFrame,
    /// Only fields changed since the previous message.
    DeltaFrame,
    Event,
    KeepAlive,
}

/// Why a received DataSetMessage could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataSetDecodeErrorReason {
    #[default]
    NoError,
    /// The reader's metadata has a different major version.
    MetadataMajorVersion,
}

/// One DataSetWriter's contribution to a network message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSetMessage {
    pub data_set_writer_id: u16,
    #[serde(default)]
    pub field_content_mask: DataSetFieldContentMask,
    #[serde(default)]
    pub content_mask: DataSetMessageContentMask,
    #[serde(default)]
    pub meta_data_version: ConfigurationVersion,
    /// Writer scoped, strictly increasing.
    pub sequence_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: StatusCode,
    #[serde(default)]
    pub message_type: DataSetMessageType,
    pub data_set: DataSet,
    /// Set by decoders, never encoded.
    #[serde(skip)]
    pub decode_error_reason: DataSetDecodeErrorReason,
}

impl DataSetMessage {
    /// Message carrying `data_set` as written by `writer`.
    ///
    /// Sequence number and delta flag are taken from the data set.
    pub fn from_data_set(writer: &DataSetWriterDataType, data_set: DataSet) -> Self {
        let meta_data_version = data_set
            .data_set_meta_data
            .as_ref()
            .map(|m| m.configuration_version)
            .unwrap_or_default();
        let message_type = if data_set.is_delta_frame {
            DataSetMessageType::DeltaFrame
        } else {
            DataSetMessageType::KeyFrame
        };
        Self {
            data_set_writer_id: writer.data_set_writer_id,
            field_content_mask: writer.data_set_field_content_mask,
            content_mask: writer.data_set_message_content_mask,
            meta_data_version,
            sequence_number: data_set.sequence_number,
            timestamp: Some(Utc::now()),
            status: StatusCode::GOOD,
            message_type,
            data_set,
            decode_error_reason: DataSetDecodeErrorReason::NoError,
        }
    }

    pub fn is_delta_frame(&self) -> bool {
        self.message_type == DataSetMessageType::DeltaFrame
    }
}
