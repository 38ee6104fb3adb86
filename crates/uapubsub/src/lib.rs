// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OPC UA PubSub engine
//!
//! Configuration, connection orchestration and publish-state bookkeeping for
//! OPC UA PubSub (Part 14) publishers and subscribers.
//!
//! # Features
//!
//! - **Configurator**: authoritative configuration tree with ids, sibling-unique
//!   names, cascading removal and Disabled/Paused/Operational state propagation
//! - **Publish state**: keyframe/delta cadence, per-writer sequence numbers,
//!   unchanged-field suppression and metadata change detection
//! - **Publishers**: one periodic task per writer group, gated on connection,
//!   group and writer state
//! - **Receive path**: raw-data hook, reader filtering, metadata driven
//!   configuration updates and discovery responses
//! - **Transports**: pluggable through [`ConnectionFactory`]; an in-process
//!   [`LoopbackBus`] transport ships with the crate
//!
//! # Architecture
//!
//! ```text
//!                         PubSubApplication
//!                                |
//!        +-----------------------+------------------------+
//!        |                       |                        |
//!  PubSubConfigurator      DataCollector             EventHub --> PubSubEventListener
//!        | events                | DataSet                ^
//!        v                       v                        |
//!   Connection (per configured connection) ---------------+
//!     +-- ConnectionCore   (can_publish, create_data_set, receive routing)
//!     +-- dyn PubSubConnection (transport: loopback, UDP, MQTT, ...)
//!     +-- Publisher per writer group
//!           +-- IntervalRunner (tokio task)
//!           +-- WriterGroupPublishState
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use uapubsub::{LoopbackBus, PubSubApplication, PubSubConfiguration};
//!
//! let config = PubSubConfiguration::from_file("pubsub.toml")?;
//! let application = PubSubApplication::builder()
//!     .loopback(LoopbackBus::default())
//!     .configuration(config)
//!     .build()?;
//! application.start().await?;
//! ```

pub mod application;
pub mod config;
pub mod configuration_version;
pub mod configurator;
pub mod connection;
pub mod data_collector;
pub mod data_set;
pub mod error;
pub mod events;
pub mod interval_runner;
pub mod message;
pub mod publish_state;
pub mod publisher;
pub mod transport;
pub mod types;

pub use application::{PubSubApplication, PubSubApplicationBuilder};
pub use config::ConfigError;
pub use configuration_version::calculate_configuration_version;
pub use configurator::{
    ConfigId, ConfigKind, ConfigObject, ConfiguratorEvent, ConfiguratorListener,
    PubSubConfigurator, PubSubState,
};
pub use connection::{Connection, ConnectionCore, PubSubConnection};
pub use data_collector::{DataCollector, DataStore, InMemoryDataStore};
pub use data_set::{DataSet, Field};
pub use error::{PubSubError, Result};
pub use events::{
    ConfigurationProperty, ConfigurationUpdatingEventArgs, DataReceivedEventArgs,
    DataSetWriterConfigurationReceivedEventArgs, EventHub, MetaDataReceivedEventArgs,
    PubSubEventListener, PublisherEndpointsReceivedEventArgs, RawDataReceivedEventArgs,
};
pub use interval_runner::IntervalRunner;
pub use message::{
    DataSetMessage, JsonCodec, NetworkMessage, NetworkMessageCodec, NetworkMessagePayload,
};
pub use publish_state::WriterGroupPublishState;
pub use publisher::{Publisher, PublisherStatsSnapshot};
pub use transport::{ConnectionFactory, LoopbackBus, LoopbackTransportFactory};
pub use types::{
    DataSetMetaData, DataSetReaderDataType, DataSetWriterDataType, DataValue,
    PubSubConfiguration, PubSubConnectionDataType, PublishedDataSetDataType, PublisherId,
    StatusCode, TransportProfile, Variant, WriterGroupDataType,
};
