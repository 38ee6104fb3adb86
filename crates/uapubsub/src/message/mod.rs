// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Network message model.
//!
//! ```text
//! NetworkMessage
//! +-- header: PublisherId, WriterGroupId, [DataSetWriterId], sequence, timestamp
//! +-- payload (one of)
//!     +-- DataSetMessages: DataSetMessage*  (writer id, sequence, version, DataSet)
//!     +-- MetaData: DataSetMetaData
//!     +-- discovery request / response
//! ```
//!
//! Encoding is left to a [`NetworkMessageCodec`]; the model only fixes how a
//! decoded message is classified on the receive path.

mod codec;
mod data_set_message;
mod network_message;

pub use codec::{JsonCodec, NetworkMessageCodec};
pub use data_set_message::{DataSetDecodeErrorReason, DataSetMessage, DataSetMessageType};
pub use network_message::{NetworkMessage, NetworkMessagePayload};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_set::{DataSet, Field};
    use crate::types::{
        ConfigurationVersion, DataSetMetaData, DataSetReaderDataType, DataSetWriterDataType,
        DataValue, PublisherId, StatusCode, Variant, WriterGroupDataType,
    };

    fn data_message(writer_ids: &[u16]) -> NetworkMessage {
        let group = WriterGroupDataType::new("G", 7, 100.0);
        let messages = writer_ids
            .iter()
            .map(|id| {
                let writer = DataSetWriterDataType::new(format!("W{}", id), *id, "Simple");
                let mut data_set = DataSet::new(
                    "Simple",
                    vec![Field::new(DataValue::new(Variant::Int32(i32::from(*id))))],
                );
                data_set.sequence_number = 3;
                let mut meta = DataSetMetaData::new("Simple", Vec::new());
                meta.configuration_version = ConfigurationVersion::new(10, 11);
                data_set.data_set_meta_data = Some(meta);
                DataSetMessage::from_data_set(&writer, data_set)
            })
            .collect();
        NetworkMessage::data(PublisherId::UInt16(1), &group, messages)
    }

    #[test]
    fn test_classification() {
        let data = data_message(&[1, 2]);
        assert!(!data.is_meta_data_message());
        assert!(!data.is_discovery_message());
        assert_eq!(data.data_set_messages().len(), 2);
        assert_eq!(data.data_set_writer_id, None);
        assert_eq!(data.data_set_messages()[0].meta_data_version.major_version, 10);

        let single = data_message(&[4]);
        assert_eq!(single.data_set_writer_id, Some(4));

        let meta = NetworkMessage::meta_data(
            PublisherId::UInt16(1),
            7,
            1,
            DataSetMetaData::new("Simple", Vec::new()),
        );
        assert!(meta.is_meta_data_message());
        assert!(meta.data_set_messages().is_empty());
        assert!(meta.data_set_meta_data().is_some());

        let request = NetworkMessage::discovery(
            PublisherId::Null,
            NetworkMessagePayload::PublisherEndpointsRequest,
        );
        assert!(request.is_discovery_message());
    }

    #[test]
    fn test_json_codec_preserves_message() {
        let message = data_message(&[1]);
        let codec = JsonCodec;
        let bytes = codec.encode(&message).expect("encode");
        let decoded = codec.decode(&bytes).expect("decode");
        assert_eq!(decoded, message);

        let err = codec.decode(b"{not json").expect_err("garbage");
        assert_eq!(err.status_code(), StatusCode::BAD_DECODING_ERROR);
    }

    #[test]
    fn test_retain_for_readers() {
        let mut message = data_message(&[1, 2, 3]);
        let mut reader = DataSetReaderDataType::new("R", PublisherId::UInt16(1), 7, 2);
        let mut meta = DataSetMetaData::new("Simple", Vec::new());
        meta.configuration_version = ConfigurationVersion::new(99, 99);
        reader.data_set_meta_data = Some(meta);
        let wildcard = DataSetReaderDataType::new("Any", PublisherId::Null, 0, 3);

        message.retain_for_readers(&[reader, wildcard]);

        let kept: Vec<(u16, DataSetDecodeErrorReason)> = message
            .data_set_messages()
            .iter()
            .map(|m| (m.data_set_writer_id, m.decode_error_reason))
            .collect();
        assert_eq!(
            kept,
            vec![
                (2, DataSetDecodeErrorReason::MetadataMajorVersion),
                (3, DataSetDecodeErrorReason::NoError),
            ]
        );
    }

    #[test]
    fn test_retain_for_readers_other_publisher() {
        let mut message = data_message(&[1]);
        let reader = DataSetReaderDataType::new("R", PublisherId::UInt16(2), 0, 0);
        message.retain_for_readers(&[reader]);
        assert!(message.data_set_messages().is_empty());
    }
}
