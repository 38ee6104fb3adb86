// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configuration file handling.
//!
//! The persisted form of a [`PubSubConfiguration`] is TOML:
//!
//! ```toml
//! enabled = true
//!
//! [[published_data_sets]]
//! name = "Simple"
//!
//! [published_data_sets.data_set_meta_data]
//! name = "Simple"
//!
//! [[published_data_sets.data_set_meta_data.fields]]
//! name = "Temperature"
//! built_in_type = "Double"
//!
//! [[published_data_sets.published_data]]
//! published_variable = "ns=1;s=Temperature"
//!
//! [[connections]]
//! name = "UADPConnection1"
//! transport_profile_uri = "http://opcfoundation.org/UA-Profile/Transport/pubsub-udp-uadp"
//! publisher_id = { UInt16 = 1 }
//!
//! [[connections.writer_groups]]
//! name = "WriterGroup1"
//! writer_group_id = 1
//! publishing_interval = 100.0
//!
//! [[connections.writer_groups.data_set_writers]]
//! name = "Writer1"
//! data_set_writer_id = 1
//! data_set_name = "Simple"
//! key_frame_count = 4
//! ```

use crate::types::{PubSubConfiguration, TransportProfile};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl PubSubConfiguration {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write the configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Check cross references and value ranges the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let data_set_names: HashSet<&str> = self
            .published_data_sets
            .iter()
            .map(|pds| pds.name.as_str())
            .collect();

        for connection in &self.connections {
            connection
                .transport_profile_uri
                .parse::<TransportProfile>()
                .map_err(|_| {
                    ConfigError::Invalid(format!(
                        "Connection '{}' uses unknown transport profile '{}'",
                        connection.name, connection.transport_profile_uri
                    ))
                })?;

            let mut group_ids = HashSet::new();
            for group in &connection.writer_groups {
                if group.writer_group_id != 0 && !group_ids.insert(group.writer_group_id) {
                    return Err(ConfigError::Invalid(format!(
                        "Connection '{}' has duplicate WriterGroupId {}",
                        connection.name, group.writer_group_id
                    )));
                }
                if !group.publishing_interval.is_finite() || group.publishing_interval < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "WriterGroup '{}' has invalid publishing interval {}",
                        group.name, group.publishing_interval
                    )));
                }

                let mut writer_ids = HashSet::new();
                for writer in &group.data_set_writers {
                    if writer.data_set_writer_id != 0
                        && !writer_ids.insert(writer.data_set_writer_id)
                    {
                        return Err(ConfigError::Invalid(format!(
                            "WriterGroup '{}' has duplicate DataSetWriterId {}",
                            group.name, writer.data_set_writer_id
                        )));
                    }
                    if !writer.data_set_name.is_empty()
                        && !data_set_names.contains(writer.data_set_name.as_str())
                    {
                        return Err(ConfigError::Invalid(format!(
                            "DataSetWriter '{}' references unknown PublishedDataSet '{}'",
                            writer.name, writer.data_set_name
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        BuiltInType, DataSetMetaData, DataSetWriterDataType, FieldMetaData, PublisherId,
        PubSubConnectionDataType, PublishedDataSetDataType, WriterGroupDataType,
        UDP_UADP_PROFILE_URI,
    };

    fn sample() -> PubSubConfiguration {
        let meta = DataSetMetaData::new(
            "Simple",
            vec![FieldMetaData::scalar("Temperature", BuiltInType::Double)],
        );
        let mut group = WriterGroupDataType::new("WriterGroup1", 1, 100.0);
        group
            .data_set_writers
            .push(DataSetWriterDataType::new("Writer1", 1, "Simple").with_key_frame_count(4));
        let mut connection = PubSubConnectionDataType::new("Conn1", UDP_UADP_PROFILE_URI);
        connection.publisher_id = PublisherId::UInt16(1);
        connection.writer_groups.push(group);

        PubSubConfiguration {
            enabled: true,
            published_data_sets: vec![PublishedDataSetDataType::new("Simple", meta)],
            connections: vec![connection],
        }
    }

    #[test]
    fn test_parse_documented_example() {
        let text = r#"
enabled = true

[[published_data_sets]]
name = "Simple"

[published_data_sets.data_set_meta_data]
name = "Simple"

[[published_data_sets.data_set_meta_data.fields]]
name = "Temperature"
built_in_type = "Double"

[[published_data_sets.published_data]]
published_variable = "ns=1;s=Temperature"

[[connections]]
name = "UADPConnection1"
transport_profile_uri = "http://opcfoundation.org/UA-Profile/Transport/pubsub-udp-uadp"
publisher_id = { UInt16 = 1 }

[[connections.writer_groups]]
name = "WriterGroup1"
writer_group_id = 1
publishing_interval = 100.0

[[connections.writer_groups.data_set_writers]]
name = "Writer1"
data_set_writer_id = 1
data_set_name = "Simple"
key_frame_count = 4
"#;
        let config = PubSubConfiguration::from_toml_str(text).expect("valid config");
        assert_eq!(config.connections.len(), 1);
        assert_eq!(config.connections[0].publisher_id, PublisherId::UInt16(1));
        let writer = &config.connections[0].writer_groups[0].data_set_writers[0];
        assert_eq!(writer.key_frame_count, 4);
        assert!(writer.enabled);
        assert_eq!(
            config.published_data_sets[0].published_data[0].attribute_id,
            crate::types::VALUE_ATTRIBUTE_ID
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pubsub.toml");
        let config = sample();

        config.save(&path).expect("save");
        let loaded = PubSubConfiguration::from_file(&path).expect("reload");

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_unknown_data_set() {
        let mut config = sample();
        config.connections[0].writer_groups[0].data_set_writers[0].data_set_name =
            "Missing".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_unknown_transport() {
        let mut config = sample();
        config.connections[0].transport_profile_uri = "http://example.com/amqp".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_duplicate_writer_ids() {
        let mut config = sample();
        let writer = DataSetWriterDataType::new("Writer2", 1, "Simple");
        config.connections[0].writer_groups[0]
            .data_set_writers
            .push(writer);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_negative_interval() {
        let mut config = sample();
        config.connections[0].writer_groups[0].publishing_interval = -1.0;
        assert!(config.validate().is_err());
    }
}
