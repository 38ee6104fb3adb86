// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the configurator, the publish pipeline and transports.

use crate::config::ConfigError;
use crate::configurator::{ConfigId, ConfigKind};
use crate::types::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PubSubError>;

/// PubSub errors.
///
/// Every variant maps onto an OPC UA status code via [`PubSubError::status_code`].
#[derive(Debug, Error)]
pub enum PubSubError {
    /// A sibling of the same kind already uses this name. Nothing was changed.
    #[error("Browse name '{0}' is already used by a sibling")]
    BrowseNameDuplicated(String),

    #[error("Unknown configuration id {0}")]
    NodeIdUnknown(ConfigId),

    #[error("Configuration id {id} is a {actual}, expected a {expected}")]
    NodeIdInvalid {
        id: ConfigId,
        expected: ConfigKind,
        actual: ConfigKind,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Precondition violated by the caller (bad parent id, wrong parent kind, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unsupported transport profile '{0}'")]
    UnsupportedTransport(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PubSubError {
    /// OPC UA status code equivalent of this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BrowseNameDuplicated(_) => StatusCode::BAD_BROWSE_NAME_DUPLICATED,
            Self::NodeIdUnknown(_) => StatusCode::BAD_NODE_ID_UNKNOWN,
            Self::NodeIdInvalid { .. } => StatusCode::BAD_NODE_ID_INVALID,
            Self::InvalidState(_) => StatusCode::BAD_INVALID_STATE,
            Self::NotFound(_) => StatusCode::BAD_NOT_FOUND,
            Self::Encoding(_) => StatusCode::BAD_ENCODING_ERROR,
            Self::Decoding(_) => StatusCode::BAD_DECODING_ERROR,
            Self::InvalidArgument(_)
            | Self::UnsupportedTransport(_)
            | Self::Transport(_)
            | Self::Config(_) => StatusCode::BAD_INVALID_ARGUMENT,
        }
    }
}
