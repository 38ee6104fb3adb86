// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport independent half of a connection.
//!
//! [`ConnectionCore`] answers the questions every transport asks on the
//! publish path (may this group publish, what does this writer send) and
//! classifies decoded messages on the receive path:
//!
//! ```text
//! bytes --RawDataReceived--> decode --+-- MetaData        -> ConfigurationUpdating*, MetaDataReceived
//!        (handled = stop)             +-- DataSetMessages -> DataReceived
//!                                     +-- discovery resp. -> DataSetWriterConfigurationReceived
//!                                                            | PublisherEndpointsReceived
//! ```

use crate::configurator::{ConfigId, ConfigKind, ConfigObject, PubSubConfigurator, PubSubState};
use crate::data_collector::DataCollector;
use crate::data_set::DataSet;
use crate::events::{
    ConfigurationProperty, ConfigurationUpdatingEventArgs, DataReceivedEventArgs,
    DataSetWriterConfigurationReceivedEventArgs, EventHub, MetaDataReceivedEventArgs,
    PublisherEndpointsReceivedEventArgs, RawDataReceivedEventArgs,
};
use crate::message::{NetworkMessage, NetworkMessageCodec, NetworkMessagePayload};
use crate::publish_state::WriterGroupPublishState;
use crate::types::{
    DataSetMetaData, DataSetReaderDataType, DataSetWriterDataType, EndpointDescription,
    PubSubConnectionDataType, PublisherId, StatusCode, TransportProfile, WriterGroupDataType,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Discovery answer for one requested DataSetWriter id.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetWriterConfigurationResponse {
    pub data_set_writer_ids: Vec<u16>,
    /// The whole writer group owning the writer.
    pub configuration: Option<WriterGroupDataType>,
    pub status_codes: Vec<StatusCode>,
}

impl From<DataSetWriterConfigurationResponse> for NetworkMessagePayload {
    fn from(response: DataSetWriterConfigurationResponse) -> Self {
        NetworkMessagePayload::DataSetWriterConfiguration {
            data_set_writer_ids: response.data_set_writer_ids,
            configuration: response.configuration,
            status_codes: response.status_codes,
        }
    }
}

/// Shared state and behaviour of one configured connection.
pub struct ConnectionCore {
    connection_id: ConfigId,
    transport_profile: TransportProfile,
    configurator: Arc<PubSubConfigurator>,
    data_collector: Arc<DataCollector>,
    events: Arc<EventHub>,
    publisher_endpoints: Arc<RwLock<Vec<EndpointDescription>>>,
    running: AtomicBool,
}

impl ConnectionCore {
    pub fn new(
        connection_id: ConfigId,
        transport_profile: TransportProfile,
        configurator: Arc<PubSubConfigurator>,
        data_collector: Arc<DataCollector>,
        events: Arc<EventHub>,
        publisher_endpoints: Arc<RwLock<Vec<EndpointDescription>>>,
    ) -> Self {
        Self {
            connection_id,
            transport_profile,
            configurator,
            data_collector,
            events,
            publisher_endpoints,
            running: AtomicBool::new(false),
        }
    }

    pub fn connection_id(&self) -> ConfigId {
        self.connection_id
    }

    pub fn transport_profile(&self) -> TransportProfile {
        self.transport_profile
    }

    pub fn configurator(&self) -> &Arc<PubSubConfigurator> {
        &self.configurator
    }

    pub fn events(&self) -> &Arc<EventHub> {
        &self.events
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// Current configuration of the connection with all of its groups.
    pub fn configuration(&self) -> Option<PubSubConnectionDataType> {
        self.configurator.connection(self.connection_id)
    }

    pub fn publisher_id(&self) -> PublisherId {
        match self.configurator.find_object_by_id(self.connection_id) {
            Some(ConfigObject::Connection(connection)) => connection.publisher_id,
            _ => PublisherId::Null,
        }
    }

    pub fn publisher_endpoints(&self) -> Vec<EndpointDescription> {
        self.publisher_endpoints.read().clone()
    }

    /// Metadata of the PublishedDataSet `data_set_name`.
    pub fn data_set_meta_data(&self, data_set_name: &str) -> Option<DataSetMetaData> {
        self.data_collector
            .published_data_set(data_set_name)
            .map(|pds| pds.data_set_meta_data)
    }

    // ------------------------------------------------------------------------
    // Publish path
    // ------------------------------------------------------------------------

    /// Whether the writer group `writer_group_id` may publish now.
    ///
    /// Requires a running connection, connection and group Operational, and
    /// at least one enabled DataSetWriter in the group.
    pub fn can_publish(&self, writer_group_id: ConfigId) -> bool {
        if !self.is_running() {
            return false;
        }
        if self.configurator.find_state_for_id(self.connection_id) != PubSubState::Operational
            || self.configurator.find_state_for_id(writer_group_id) != PubSubState::Operational
        {
            return false;
        }
        self.configurator
            .children_of_kind(writer_group_id, ConfigKind::DataSetWriter)
            .into_iter()
            .any(|id| {
                matches!(
                    self.configurator.find_object_by_id(id),
                    Some(ConfigObject::DataSetWriter(writer)) if writer.enabled
                )
            })
    }

    /// Next DataSet of `writer`, or `None` when there is nothing to send.
    ///
    /// Sequence number and delta flag come from `state`. A delta frame only
    /// keeps the changed fields and is `None` when nothing changed.
    pub fn create_data_set(
        &self,
        writer: &DataSetWriterDataType,
        state: &WriterGroupPublishState,
    ) -> Option<DataSet> {
        if !writer.enabled {
            return None;
        }
        let (is_delta_frame, sequence_number) = state.is_delta_frame(writer);
        let Some(mut data_set) = self.data_collector.collect_data(&writer.data_set_name) else {
            debug!(
                "DataSetWriter '{}' references unknown PublishedDataSet '{}'",
                writer.name, writer.data_set_name
            );
            return None;
        };
        data_set.sequence_number = sequence_number;
        data_set.is_delta_frame = is_delta_frame;
        data_set.data_set_writer_id = writer.data_set_writer_id;

        if is_delta_frame {
            state.exclude_unchanged_fields(writer, data_set)
        } else {
            Some(data_set)
        }
    }

    // ------------------------------------------------------------------------
    // Receive path
    // ------------------------------------------------------------------------

    /// DataSetReaders whose connection, reader group and own state are all Operational.
    pub fn operational_data_set_readers(&self) -> Vec<DataSetReaderDataType> {
        if self.configurator.find_state_for_id(self.connection_id) != PubSubState::Operational {
            return Vec::new();
        }
        self.configurator
            .data_set_readers_of_connection(self.connection_id)
            .into_iter()
            .filter(|(group_id, reader_id, _)| {
                self.configurator.find_state_for_id(*group_id) == PubSubState::Operational
                    && self.configurator.find_state_for_id(*reader_id) == PubSubState::Operational
            })
            .map(|(_, _, reader)| reader)
            .collect()
    }

    /// One response per requested id; unknown ids get `BadNotFound`.
    pub fn data_set_writer_discovery_responses(
        &self,
        data_set_writer_ids: &[u16],
    ) -> Vec<DataSetWriterConfigurationResponse> {
        let groups: Vec<WriterGroupDataType> = self
            .configuration()
            .map(|c| c.writer_groups)
            .unwrap_or_default();

        data_set_writer_ids
            .iter()
            .map(|id| {
                let owner = groups
                    .iter()
                    .find(|g| g.data_set_writers.iter().any(|w| w.data_set_writer_id == *id));
                match owner {
                    Some(group) => DataSetWriterConfigurationResponse {
                        data_set_writer_ids: vec![*id],
                        configuration: Some(group.clone()),
                        status_codes: vec![StatusCode::GOOD],
                    },
                    None => DataSetWriterConfigurationResponse {
                        data_set_writer_ids: vec![*id],
                        configuration: None,
                        status_codes: vec![StatusCode::BAD_NOT_FOUND],
                    },
                }
            })
            .collect()
    }

    /// Raise `RawDataReceived`; `None` when a listener handled the bytes.
    pub fn raise_raw_data_received(&self, bytes: Vec<u8>, source: &str) -> Option<Vec<u8>> {
        if self.events.listener_count() == 0 {
            return Some(bytes);
        }
        let connection = self.configuration().unwrap_or_default();
        let mut args = RawDataReceivedEventArgs {
            message: bytes,
            source: source.to_string(),
            transport_protocol: self.transport_profile.protocol(),
            message_mapping: self.transport_profile.message_mapping(),
            connection,
            handled: false,
        };
        self.events.raise_raw_data_received(&mut args);
        if args.handled {
            debug!("Raw message from {} handled by a listener", source);
            None
        } else {
            Some(args.message)
        }
    }

    /// Raise `RawDataReceived` and decode what no listener handled.
    ///
    /// Data messages are reduced to what operational readers subscribe to.
    pub fn decode_received(
        &self,
        bytes: Vec<u8>,
        source: &str,
        codec: &dyn NetworkMessageCodec,
    ) -> Option<NetworkMessage> {
        let bytes = self.raise_raw_data_received(bytes, source)?;
        let mut message = match codec.decode(&bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping undecodable message from {}: {}", source, e);
                return None;
            }
        };
        if !message.data_set_messages().is_empty() {
            message.retain_for_readers(&self.operational_data_set_readers());
        }
        Some(message)
    }

    /// Route a decoded message to the matching application event.
    pub fn process_decoded_network_message(&self, message: NetworkMessage, source: &str) {
        if let Some(meta_data) = message.data_set_meta_data() {
            self.update_reader_meta_data(&message, meta_data);
            self.events.raise_meta_data_received(&MetaDataReceivedEventArgs {
                network_message: message,
                source: source.to_string(),
            });
            return;
        }

        if !message.data_set_messages().is_empty() {
            self.events.raise_data_received(&DataReceivedEventArgs {
                network_message: message,
                source: source.to_string(),
            });
            return;
        }

        let publisher_id = message.publisher_id;
        match message.payload {
            NetworkMessagePayload::DataSetWriterConfiguration {
                data_set_writer_ids,
                configuration,
                status_codes,
            } => {
                self.events.raise_data_set_writer_configuration_received(
                    &DataSetWriterConfigurationReceivedEventArgs {
                        data_set_writer_ids,
                        configuration,
                        publisher_id,
                        status_codes,
                        source: source.to_string(),
                    },
                );
            }
            NetworkMessagePayload::PublisherEndpoints { endpoints, status } => {
                self.events.raise_publisher_endpoints_received(
                    &PublisherEndpointsReceivedEventArgs {
                        publisher_id,
                        endpoints,
                        status_code: status,
                        source: source.to_string(),
                    },
                );
            }
            _ => debug!("Ignoring message without payload for the application from {}", source),
        }
    }

    fn update_reader_meta_data(&self, message: &NetworkMessage, meta_data: &DataSetMetaData) {
        let Some(writer_id) = message.data_set_writer_id else {
            return;
        };
        let readers = self
            .configurator
            .data_set_readers_of_connection(self.connection_id);
        for (_, reader_id, reader) in readers {
            if reader.data_set_writer_id != writer_id
                || !reader.publisher_id.matches(&message.publisher_id)
            {
                continue;
            }
            let current = reader
                .data_set_meta_data
                .as_ref()
                .map(|m| m.configuration_version);
            if current == Some(meta_data.configuration_version) {
                continue;
            }

            let mut args = ConfigurationUpdatingEventArgs {
                changed_property: ConfigurationProperty::DataSetMetaData,
                parent: reader_id,
                new_value: meta_data.clone(),
                cancel: false,
            };
            self.events.raise_configuration_updating(&mut args);
            if args.cancel {
                debug!("Metadata update of DataSetReader '{}' cancelled", reader.name);
                continue;
            }
            if let Err(e) = self
                .configurator
                .update_data_set_reader_meta_data(reader_id, args.new_value)
            {
                warn!("Cannot update metadata of DataSetReader '{}': {}", reader.name, e);
            }
        }
    }
}
