// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OPC UA status codes used by the PubSub layer.
//!
//! Only the codes this crate produces or inspects are named; any other value
//! received from the wire is carried through untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity mask (top two bits).
const SEVERITY_MASK: u32 = 0xC000_0000;
const SEVERITY_UNCERTAIN: u32 = 0x4000_0000;
const SEVERITY_BAD: u32 = 0x8000_0000;

/// A 32-bit OPC UA status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const GOOD: Self = Self(0x0000_0000);
    pub const UNCERTAIN_SUBSTITUTE_VALUE: Self = Self(0x4091_0000);
    pub const BAD_ENCODING_ERROR: Self = Self(0x8006_0000);
    pub const BAD_DECODING_ERROR: Self = Self(0x8007_0000);
    pub const BAD_NODE_ID_INVALID: Self = Self(0x8033_0000);
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    pub const BAD_NOT_FOUND: Self = Self(0x803E_0000);
    pub const BAD_BROWSE_NAME_DUPLICATED: Self = Self(0x8061_0000);
    pub const BAD_INVALID_ARGUMENT: Self = Self(0x80AB_0000);
    pub const BAD_INVALID_STATE: Self = Self(0x80AF_0000);
    pub const BAD_NO_DATA_AVAILABLE: Self = Self(0x80B1_0000);

    pub fn is_good(self) -> bool {
        self.0 & SEVERITY_MASK == 0
    }

    pub fn is_uncertain(self) -> bool {
        self.0 & SEVERITY_MASK == SEVERITY_UNCERTAIN
    }

    pub fn is_bad(self) -> bool {
        self.0 & SEVERITY_BAD != 0
    }

    /// Symbolic name for the codes this crate knows about.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::GOOD => "Good",
            Self::UNCERTAIN_SUBSTITUTE_VALUE => "UncertainSubstituteValue",
            Self::BAD_ENCODING_ERROR => "BadEncodingError",
            Self::BAD_DECODING_ERROR => "BadDecodingError",
            Self::BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_NOT_FOUND => "BadNotFound",
            Self::BAD_BROWSE_NAME_DUPLICATED => "BadBrowseNameDuplicated",
            Self::BAD_INVALID_ARGUMENT => "BadInvalidArgument",
            Self::BAD_INVALID_STATE => "BadInvalidState",
            Self::BAD_NO_DATA_AVAILABLE => "BadNoDataAvailable",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}
