// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! NetworkMessage: the unit a transport sends and receives.

use super::data_set_message::{DataSetDecodeErrorReason, DataSetMessage};
use crate::types::{
    DataSetMetaData, DataSetReaderDataType, EndpointDescription, NetworkMessageContentMask,
    PublisherId, StatusCode, WriterGroupDataType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content of a network message. Exactly one shape per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NetworkMessagePayload {
    /// Data message; may be empty after reader filtering.
    DataSetMessages(Vec<DataSetMessage>),
    /// Metadata of the DataSet written by the message's DataSetWriter.
    MetaData(DataSetMetaData),
    /// Discovery request for the metadata of the listed writers.
    MetaDataRequest { data_set_writer_ids: Vec<u16> },
    /// Discovery request for the configuration of the listed writers.
    DataSetWriterConfigurationRequest { data_set_writer_ids: Vec<u16> },
    /// Discovery response: the writer group owning the writers, one status per id.
    DataSetWriterConfiguration {
        data_set_writer_ids: Vec<u16>,
        configuration: Option<WriterGroupDataType>,
        status_codes: Vec<StatusCode>,
    },
    PublisherEndpointsRequest,
    PublisherEndpoints {
        endpoints: Vec<EndpointDescription>,
        status: StatusCode,
    },
}

/// A network message with its header fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMessage {
    #[serde(default)]
    pub publisher_id: PublisherId,
    #[serde(default)]
    pub writer_group_id: u16,
    /// Set for metadata messages and single DataSetMessage layouts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_set_writer_id: Option<u16>,
    #[serde(default)]
    pub sequence_number: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub content_mask: NetworkMessageContentMask,
    pub payload: NetworkMessagePayload,
}

impl NetworkMessage {
    fn with_payload(publisher_id: PublisherId, payload: NetworkMessagePayload) -> Self {
        Self {
            publisher_id,
            writer_group_id: 0,
            data_set_writer_id: None,
            sequence_number: 0,
            timestamp: Some(Utc::now()),
            content_mask: NetworkMessageContentMask::empty(),
            payload,
        }
    }

    /// Data message of `group` carrying `messages`.
    pub fn data(
        publisher_id: PublisherId,
        group: &WriterGroupDataType,
        messages: Vec<DataSetMessage>,
    ) -> Self {
        let data_set_writer_id = match messages.as_slice() {
            [single] => Some(single.data_set_writer_id),
            _ => None,
        };
        Self {
            writer_group_id: group.writer_group_id,
            data_set_writer_id,
            content_mask: group.network_message_content_mask,
            ..Self::with_payload(publisher_id, NetworkMessagePayload::DataSetMessages(messages))
        }
    }

    /// Metadata message for one DataSetWriter.
    pub fn meta_data(
        publisher_id: PublisherId,
        writer_group_id: u16,
        data_set_writer_id: u16,
        meta_data: DataSetMetaData,
    ) -> Self {
        Self {
            writer_group_id,
            data_set_writer_id: Some(data_set_writer_id),
            ..Self::with_payload(publisher_id, NetworkMessagePayload::MetaData(meta_data))
        }
    }

    /// Discovery request or response.
    pub fn discovery(publisher_id: PublisherId, payload: NetworkMessagePayload) -> Self {
        Self::with_payload(publisher_id, payload)
    }

    pub fn is_meta_data_message(&self) -> bool {
        matches!(self.payload, NetworkMessagePayload::MetaData(_))
    }

    /// DataSetMessages of a data message; empty for every other shape.
    pub fn data_set_messages(&self) -> &[DataSetMessage] {
        match &self.payload {
            NetworkMessagePayload::DataSetMessages(messages) => messages,
            _ => &[],
        }
    }

    pub fn data_set_meta_data(&self) -> Option<&DataSetMetaData> {
        match &self.payload {
            NetworkMessagePayload::MetaData(meta) => Some(meta),
            _ => None,
        }
    }

    /// Request or response of the discovery protocol.
    pub fn is_discovery_message(&self) -> bool {
        !matches!(
            self.payload,
            NetworkMessagePayload::DataSetMessages(_) | NetworkMessagePayload::MetaData(_)
        )
    }

    /// Keep only DataSetMessages some reader subscribes to.
    ///
    /// A kept message whose metadata major version differs from every
    /// matching reader's metadata is flagged with
    /// [`DataSetDecodeErrorReason::MetadataMajorVersion`].
    pub fn retain_for_readers(&mut self, readers: &[DataSetReaderDataType]) {
        let publisher_id = self.publisher_id.clone();
        let writer_group_id = self.writer_group_id;
        let NetworkMessagePayload::DataSetMessages(messages) = &mut self.payload else {
            return;
        };
        messages.retain_mut(|message| {
            let matching: Vec<&DataSetReaderDataType> = readers
                .iter()
                .filter(|r| r.matches(&publisher_id, writer_group_id, message.data_set_writer_id))
                .collect();
            if matching.is_empty() {
                return false;
            }
            let version_known = matching.iter().any(|r| {
                r.data_set_meta_data.as_ref().map_or(true, |meta| {
                    meta.configuration_version.major_version
                        == message.meta_data_version.major_version
                })
            });
            if !version_known {
                message.decode_error_reason = DataSetDecodeErrorReason::MetadataMajorVersion;
            }
            true
        });
    }
}
