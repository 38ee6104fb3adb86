// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure

//! Configuration file integration tests

use std::io::Write;
use uapubsub::{
    ConfigKind, LoopbackBus, PubSubApplication, PubSubConfiguration, PubSubError, PubSubState,
    StatusCode,
};

const CONFIG: &str = r#"
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

fn application() -> std::sync::Arc<PubSubApplication> {
    PubSubApplication::builder()
        .loopback(LoopbackBus::default())
        .build()
        .expect("application")
}

#[test]
fn test_load_file_makes_writer_operational() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(CONFIG.as_bytes()).expect("write config");

    let app = application();
    app.load_configuration_file(file.path()).expect("load");

    let configurator = app.configurator();
    let root = configurator.pub_sub_configuration_id();
    let connection = configurator.find_id_by_name(root, ConfigKind::Connection, "UADPConnection1");
    let group = configurator.find_id_by_name(connection, ConfigKind::WriterGroup, "WriterGroup1");
    let writer = configurator.find_id_by_name(group, ConfigKind::DataSetWriter, "Writer1");

    assert_eq!(configurator.find_state_for_id(writer), PubSubState::Operational);
    assert_eq!(app.connections().len(), 1);
    assert!(app.data_collector().published_data_set("Simple").is_some());
    assert_eq!(
        app.connection(connection).expect("connection").publisher_ids(),
        vec![group]
    );
}

#[test]
fn test_snapshot_round_trips_through_toml() {
    let app = application();
    let config = PubSubConfiguration::from_toml_str(CONFIG).expect("parse");
    app.load_configuration(config.clone(), true).expect("load");

    let snapshot = app.configurator().configuration();
    assert_eq!(snapshot, config);

    let text = snapshot.to_toml_string().expect("serialize");
    let reparsed = PubSubConfiguration::from_toml_str(&text).expect("reparse");
    assert_eq!(reparsed, config);
}

#[test]
fn test_reload_replaces_connections() {
    let app = application();
    let config = PubSubConfiguration::from_toml_str(CONFIG).expect("parse");
    app.load_configuration(config.clone(), true).expect("load");
    let first = app.connections()[0].connection_id();

    app.load_configuration(config, true).expect("reload");
    let connections = app.connections();
    assert_eq!(connections.len(), 1);
    assert_ne!(connections[0].connection_id(), first);
    assert!(app.connection(first).is_none());
}

#[test]
fn test_invalid_configuration_changes_nothing() {
    let app = application();
    let mut config = PubSubConfiguration::from_toml_str(CONFIG).expect("parse");
    config.connections[0].writer_groups[0].data_set_writers[0].data_set_name = "Missing".into();

    let err = app.load_configuration(config, true).expect_err("invalid");
    assert!(matches!(err, PubSubError::Config(_)));
    assert_eq!(err.status_code(), StatusCode::BAD_INVALID_ARGUMENT);
    assert_eq!(app.configurator().len(), 1);
    assert!(app.connections().is_empty());
}
