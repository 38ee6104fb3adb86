// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OPC UA data types consumed by the PubSub engine.

mod configuration;
mod content_mask;
mod meta_data;
mod status_code;
mod transport_profile;
mod variant;

pub use configuration::{
    DataSetReaderDataType, DataSetWriterDataType, Enableable, EndpointDescription,
    MessageSecurityMode, NetworkAddress, PubSubConfiguration, PubSubConnectionDataType,
    PublishedDataSetDataType, PublishedVariable, PublisherId, ReaderGroupDataType,
    WriterGroupDataType, VALUE_ATTRIBUTE_ID,
};
pub use content_mask::{
    DataSetFieldContentMask, DataSetMessageContentMask, NetworkMessageContentMask,
};
pub use meta_data::{
    BuiltInType, ConfigurationVersion, DataSetMetaData, FieldMetaData, KeyValuePair,
};
pub use status_code::StatusCode;
pub use transport_profile::{
    MessageMapping, TransportProfile, TransportProtocol, MQTT_JSON_PROFILE_URI,
    MQTT_UADP_PROFILE_URI, UDP_UADP_PROFILE_URI,
};
pub use variant::{DataValue, Variant};
