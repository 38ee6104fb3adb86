// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Content masks selecting the optional parts of network and dataset messages.
//!
//! The network-message mask is the union of the UADP and JSON header options
//! this crate understands; transports ignore bits that do not apply to their
//! mapping.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Optional network message header fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct NetworkMessageContentMask: u32 {
        const PUBLISHER_ID = 0x0001;
        const GROUP_HEADER = 0x0002;
        const WRITER_GROUP_ID = 0x0004;
        const GROUP_VERSION = 0x0008;
        const NETWORK_MESSAGE_NUMBER = 0x0010;
        const SEQUENCE_NUMBER = 0x0020;
        const PAYLOAD_HEADER = 0x0040;
        const TIMESTAMP = 0x0080;
        const PICO_SECONDS = 0x0100;
        const DATA_SET_CLASS_ID = 0x0200;
        const PROMOTED_FIELDS = 0x0400;
        /// One DataSetMessage per NetworkMessage.
        const SINGLE_DATA_SET_MESSAGE = 0x1000;
    }
}

bitflags! {
    /// Optional DataSetMessage header fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DataSetMessageContentMask: u32 {
        const TIMESTAMP = 0x0001;
        const PICO_SECONDS = 0x0002;
        const STATUS = 0x0004;
        const MAJOR_VERSION = 0x0008;
        const MINOR_VERSION = 0x0010;
        const SEQUENCE_NUMBER = 0x0020;
    }
}

bitflags! {
    /// Per-field encoding options. An empty mask means "Variant" encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct DataSetFieldContentMask: u32 {
        const STATUS_CODE = 0x0001;
        const SOURCE_TIMESTAMP = 0x0002;
        const SERVER_TIMESTAMP = 0x0004;
        const SOURCE_PICO_SECONDS = 0x0008;
        const SERVER_PICO_SECONDS = 0x0010;
        const RAW_DATA = 0x0020;
    }
}

impl NetworkMessageContentMask {
    /// Header fields most UADP publishers enable.
    pub fn uadp_default() -> Self {
        Self::PUBLISHER_ID
            | Self::GROUP_HEADER
            | Self::WRITER_GROUP_ID
            | Self::SEQUENCE_NUMBER
            | Self::PAYLOAD_HEADER
    }
}

impl DataSetMessageContentMask {
    pub fn uadp_default() -> Self {
        Self::TIMESTAMP
            | Self::STATUS
            | Self::MAJOR_VERSION
            | Self::MINOR_VERSION
            | Self::SEQUENCE_NUMBER
    }
}
