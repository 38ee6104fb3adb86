// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire encoding of network messages.

use super::NetworkMessage;
use crate::error::{PubSubError, Result};

/// Encodes and decodes [`NetworkMessage`]s for a transport.
pub trait NetworkMessageCodec: Send + Sync {
    fn encode(&self, message: &NetworkMessage) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<NetworkMessage>;
}

/// JSON encoding via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl NetworkMessageCodec for JsonCodec {
    fn encode(&self, message: &NetworkMessage) -> Result<Vec<u8>> {
        serde_json::to_vec(message).map_err(|e| PubSubError::Encoding(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<NetworkMessage> {
        serde_json::from_slice(bytes).map_err(|e| PubSubError::Decoding(e.to_string()))
    }
}
