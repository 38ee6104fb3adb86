// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PubSub transport profiles (Part 14, 6.4).

use crate::error::PubSubError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const UDP_UADP_PROFILE_URI: &str =
    "http://opcfoundation.org/UA-Profile/Transport/pubsub-udp-uadp";
pub const MQTT_UADP_PROFILE_URI: &str =
    "http://opcfoundation.org/UA-Profile/Transport/pubsub-mqtt-uadp";
pub const MQTT_JSON_PROFILE_URI: &str =
    "http://opcfoundation.org/UA-Profile/Transport/pubsub-mqtt-json";

/// Network protocol underneath a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportProtocol {
    Udp,
    Mqtt,
}

/// Message encoding used on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageMapping {
    Uadp,
    Json,
}

/// Supported combination of protocol and message mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportProfile {
    UdpUadp,
    MqttUadp,
    MqttJson,
}

impl TransportProfile {
    pub const ALL: [Self; 3] = [Self::UdpUadp, Self::MqttUadp, Self::MqttJson];

    pub fn uri(self) -> &'static str {
        match self {
            Self::UdpUadp => UDP_UADP_PROFILE_URI,
            Self::MqttUadp => MQTT_UADP_PROFILE_URI,
            Self::MqttJson => MQTT_JSON_PROFILE_URI,
        }
    }

    pub fn protocol(self) -> TransportProtocol {
        match self {
            Self::UdpUadp => TransportProtocol::Udp,
            Self::MqttUadp | Self::MqttJson => TransportProtocol::Mqtt,
        }
    }

    pub fn message_mapping(self) -> MessageMapping {
        match self {
            Self::UdpUadp | Self::MqttUadp => MessageMapping::Uadp,
            Self::MqttJson => MessageMapping::Json,
        }
    }
}

impl FromStr for TransportProfile {
    type Err = PubSubError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.uri() == uri.trim())
            .ok_or_else(|| PubSubError::UnsupportedTransport(uri.to_string()))
    }
}

impl fmt::Display for TransportProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_profiles() {
        for profile in TransportProfile::ALL {
            assert_eq!(profile.uri().parse::<TransportProfile>().ok(), Some(profile));
        }
        assert_eq!(
            MQTT_JSON_PROFILE_URI.parse::<TransportProfile>().ok(),
            Some(TransportProfile::MqttJson)
        );
    }

    #[test]
    fn test_parse_unknown_profile() {
        let err = "http://example.com/amqp"
            .parse::<TransportProfile>()
            .expect_err("unknown profile must be rejected");
        assert!(matches!(err, PubSubError::UnsupportedTransport(_)));
    }

    #[test]
    fn test_profile_components() {
        assert_eq!(TransportProfile::UdpUadp.protocol(), TransportProtocol::Udp);
        assert_eq!(TransportProfile::MqttUadp.message_mapping(), MessageMapping::Uadp);
        assert_eq!(TransportProfile::MqttJson.message_mapping(), MessageMapping::Json);
    }
}
