// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process transport.
//!
//! Every [`LoopbackConnection`] attached to the same [`LoopbackBus`] sees the
//! frames sent by the others, like UDP multicast members of one group. A
//! connection never receives its own frames.
//!
//! Messages are packed like UADP: a metadata message whenever a writer's
//! metadata version changes or its `meta_data_update_time` elapses, then one
//! network message per writer group, or one per writer when the group sets
//! `SINGLE_DATA_SET_MESSAGE`. Discovery requests are answered by connections
//! that have writer groups.
//!
//! ```text
//! LoopbackConnection A --+                    +--> receive task B --> ConnectionCore B
//!                        +--> LoopbackBus ----+
//! LoopbackConnection B --+  (broadcast)       +--> receive task A --> ConnectionCore A
//! ```

use super::ConnectionFactory;
use crate::connection::{BoxFuture, ConnectionCore, PubSubConnection};
use crate::error::Result;
use crate::message::{
    DataSetMessage, JsonCodec, NetworkMessage, NetworkMessageCodec, NetworkMessagePayload,
};
use crate::publish_state::WriterGroupPublishState;
use crate::types::{
    NetworkMessageContentMask, PubSubConnectionDataType, StatusCode, TransportProfile,
    WriterGroupDataType,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Frames buffered per receiver before it starts lagging.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

static NEXT_ENDPOINT_ID: AtomicU64 = AtomicU64::new(1);

/// One encoded network message on the bus.
#[derive(Debug, Clone)]
pub struct LoopbackFrame {
    /// Endpoint that sent the frame.
    pub origin: u64,
    /// Address reported as the source of received messages.
    pub source: String,
    pub bytes: Arc<[u8]>,
}

/// Shared medium of loopback connections.
#[derive(Clone)]
pub struct LoopbackBus {
    sender: broadcast::Sender<LoopbackFrame>,
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl LoopbackBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoopbackFrame> {
        self.sender.subscribe()
    }

    /// Returns the number of receivers the frame reached.
    pub fn send(&self, frame: LoopbackFrame) -> usize {
        self.sender.send(frame).unwrap_or(0)
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Clone)]
struct Endpoint {
    id: u64,
    source: String,
    bus: LoopbackBus,
    codec: Arc<dyn NetworkMessageCodec>,
}

impl Endpoint {
    fn send(&self, message: &NetworkMessage) -> bool {
        let bytes = match self.codec.encode(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Cannot encode network message on {}: {}", self.source, e);
                return false;
            }
        };
        let receivers = self.bus.send(LoopbackFrame {
            origin: self.id,
            source: self.source.clone(),
            bytes: bytes.into(),
        });
        trace!("{} sent a frame to {} receivers", self.source, receivers);
        true
    }
}

struct Receiving {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
    core: Arc<ConnectionCore>,
}

/// Loopback binding of one connection.
pub struct LoopbackConnection {
    endpoint: Endpoint,
    profile: TransportProfile,
    receiving: Mutex<Option<Receiving>>,
}

impl LoopbackConnection {
    /// Attach `connection` to `bus`. Fails on an unknown transport profile.
    pub fn new(
        connection: &PubSubConnectionDataType,
        bus: LoopbackBus,
        codec: Arc<dyn NetworkMessageCodec>,
    ) -> Result<Self> {
        let profile = connection.transport_profile_uri.parse()?;
        let source = if connection.address.url.is_empty() {
            format!("loopback://{}", connection.name)
        } else {
            connection.address.url.clone()
        };
        Ok(Self {
            endpoint: Endpoint {
                id: NEXT_ENDPOINT_ID.fetch_add(1, Ordering::Relaxed),
                source,
                bus,
                codec,
            },
            profile,
            receiving: Mutex::new(None),
        })
    }

    /// Address other connections see as the source of this connection's messages.
    pub fn source(&self) -> &str {
        &self.endpoint.source
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving.lock().is_some()
    }
}

impl PubSubConnection for LoopbackConnection {
    fn transport_profile(&self) -> TransportProfile {
        self.profile
    }

    fn internal_start(&self, core: Arc<ConnectionCore>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut receiving = self.receiving.lock();
            if receiving.is_some() {
                return Ok(());
            }
            let receiver = self.endpoint.bus.subscribe();
            let shutdown = Arc::new(Notify::new());
            let task = tokio::spawn(receive_loop(
                self.endpoint.clone(),
                core.clone(),
                receiver,
                shutdown.clone(),
            ));
            *receiving = Some(Receiving {
                shutdown,
                task,
                core,
            });
            info!("Loopback endpoint {} listening", self.endpoint.source);
            Ok(())
        })
    }

    fn internal_stop(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let receiving = self.receiving.lock().take();
            if let Some(receiving) = receiving {
                receiving.shutdown.notify_one();
                if let Err(e) = receiving.task.await {
                    if !e.is_cancelled() {
                        warn!("Loopback receive task of {} failed: {}", self.endpoint.source, e);
                    }
                }
                info!("Loopback endpoint {} closed", self.endpoint.source);
            }
            Ok(())
        })
    }

    fn create_network_messages(
        &self,
        core: &ConnectionCore,
        group: &WriterGroupDataType,
        state: &WriterGroupPublishState,
    ) -> Result<Vec<NetworkMessage>> {
        let publisher_id = core.publisher_id();
        let mut messages = Vec::new();
        let mut data_set_messages = Vec::new();

        for writer in group.data_set_writers.iter().filter(|w| w.enabled) {
            if let Some(meta_data) = core.data_set_meta_data(&writer.data_set_name) {
                if state.has_meta_data_changed(writer, Some(&meta_data))
                    || state.is_meta_data_update_due(writer)
                {
                    messages.push(NetworkMessage::meta_data(
                        publisher_id.clone(),
                        group.writer_group_id,
                        writer.data_set_writer_id,
                        meta_data,
                    ));
                }
            }
            if let Some(data_set) = core.create_data_set(writer, state) {
                data_set_messages.push(DataSetMessage::from_data_set(writer, data_set));
            }
        }

        let batches: Vec<Vec<DataSetMessage>> = if group
            .network_message_content_mask
            .contains(NetworkMessageContentMask::SINGLE_DATA_SET_MESSAGE)
        {
            data_set_messages.into_iter().map(|m| vec![m]).collect()
        } else if data_set_messages.is_empty() {
            Vec::new()
        } else {
            vec![data_set_messages]
        };

        for batch in batches {
            let mut message = NetworkMessage::data(publisher_id.clone(), group, batch);
            message.sequence_number = state.next_network_message_sequence_number();
            messages.push(message);
        }
        Ok(messages)
    }

    fn publish_network_message(&self, message: &NetworkMessage) -> bool {
        self.endpoint.send(message)
    }

    fn are_clients_connected(&self) -> bool {
        // Our own receiver counts once while started.
        let own = usize::from(self.is_receiving());
        self.endpoint.bus.receiver_count() > own
    }

    fn request_discovery(&self, request: NetworkMessagePayload) -> bool {
        let publisher_id = {
            let receiving = self.receiving.lock();
            match receiving.as_ref() {
                Some(receiving) => receiving.core.publisher_id(),
                None => return false,
            }
        };
        self.endpoint
            .send(&NetworkMessage::discovery(publisher_id, request))
    }
}

async fn receive_loop(
    endpoint: Endpoint,
    core: Arc<ConnectionCore>,
    mut receiver: broadcast::Receiver<LoopbackFrame>,
    shutdown: Arc<Notify>,
) {
    loop {
        let frame = tokio::select! {
            result = receiver.recv() => match result {
                Ok(frame) => frame,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("{} lagged {} frames", endpoint.source, n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = shutdown.notified() => break,
        };
        if frame.origin == endpoint.id {
            continue;
        }

        let Some(message) =
            core.decode_received(frame.bytes.to_vec(), &frame.source, endpoint.codec.as_ref())
        else {
            continue;
        };
        if !answer_discovery_request(&endpoint, &core, &message) {
            core.process_decoded_network_message(message, &frame.source);
        }
    }
    debug!("Loopback receive task of {} exited", endpoint.source);
}

/// Reply to `message` if it is a discovery request. Returns `false` for any other message.
fn answer_discovery_request(
    endpoint: &Endpoint,
    core: &ConnectionCore,
    message: &NetworkMessage,
) -> bool {
    let groups = match &message.payload {
        NetworkMessagePayload::MetaDataRequest { .. }
        | NetworkMessagePayload::DataSetWriterConfigurationRequest { .. }
        | NetworkMessagePayload::PublisherEndpointsRequest => core
            .configuration()
            .map(|c| c.writer_groups)
            .unwrap_or_default(),
        _ => return false,
    };
    if groups.is_empty() {
        return true;
    }

    let publisher_id = core.publisher_id();
    let replies: Vec<NetworkMessage> = match &message.payload {
        NetworkMessagePayload::MetaDataRequest {
            data_set_writer_ids,
        } => groups
            .iter()
            .flat_map(|group| {
                group
                    .data_set_writers
                    .iter()
                    .filter(|w| data_set_writer_ids.contains(&w.data_set_writer_id))
                    .filter_map(|w| {
                        core.data_set_meta_data(&w.data_set_name).map(|meta_data| {
                            NetworkMessage::meta_data(
                                publisher_id.clone(),
                                group.writer_group_id,
                                w.data_set_writer_id,
                                meta_data,
                            )
                        })
                    })
            })
            .collect(),
        NetworkMessagePayload::DataSetWriterConfigurationRequest {
            data_set_writer_ids,
        } => core
            .data_set_writer_discovery_responses(data_set_writer_ids)
            .into_iter()
            .map(|response| NetworkMessage::discovery(publisher_id.clone(), response.into()))
            .collect(),
        _ => {
            let endpoints = core.publisher_endpoints();
            let status = if endpoints.is_empty() {
                StatusCode::BAD_NOT_FOUND
            } else {
                StatusCode::GOOD
            };
            vec![NetworkMessage::discovery(
                publisher_id,
                NetworkMessagePayload::PublisherEndpoints { endpoints, status },
            )]
        }
    };

    debug!(
        "{} answers a discovery request from {:?} with {} messages",
        endpoint.source,
        message.publisher_id,
        replies.len()
    );
    for reply in &replies {
        endpoint.send(reply);
    }
    true
}

/// Creates [`LoopbackConnection`]s on one shared bus.
#[derive(Clone)]
pub struct LoopbackTransportFactory {
    bus: LoopbackBus,
    codec: Arc<dyn NetworkMessageCodec>,
}

impl LoopbackTransportFactory {
    /// Factory encoding with [`JsonCodec`].
    pub fn new(bus: LoopbackBus) -> Self {
        Self::with_codec(bus, Arc::new(JsonCodec))
    }

    pub fn with_codec(bus: LoopbackBus, codec: Arc<dyn NetworkMessageCodec>) -> Self {
        Self { bus, codec }
    }

    pub fn bus(&self) -> &LoopbackBus {
        &self.bus
    }
}

impl ConnectionFactory for LoopbackTransportFactory {
    fn create(&self, connection: &PubSubConnectionDataType) -> Result<Arc<dyn PubSubConnection>> {
        let transport = LoopbackConnection::new(connection, self.bus.clone(), self.codec.clone())?;
        Ok(Arc::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PubSubError;
    use crate::types::{NetworkAddress, UDP_UADP_PROFILE_URI};

    #[test]
    fn test_bus_reports_receivers() {
        let bus = LoopbackBus::new(8);
        let frame = LoopbackFrame {
            origin: 1,
            source: "a".into(),
            bytes: Arc::from(&b"x"[..]),
        };
        assert_eq!(bus.send(frame.clone()), 0);

        let mut receiver = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        assert_eq!(bus.send(frame), 1);
        let received = receiver.try_recv().expect("frame buffered");
        assert_eq!(received.source, "a");
        assert_eq!(&*received.bytes, b"x");
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let bus = LoopbackBus::new(0);
        let _receiver = bus.subscribe();
        assert_eq!(
            bus.send(LoopbackFrame {
                origin: 1,
                source: String::new(),
                bytes: Arc::from(&[][..]),
            }),
            1
        );
    }

    #[test]
    fn test_source_address() {
        let bus = LoopbackBus::default();
        let mut config = PubSubConnectionDataType::new("plant", UDP_UADP_PROFILE_URI);
        let connection =
            LoopbackConnection::new(&config, bus.clone(), Arc::new(JsonCodec)).expect("valid");
        assert_eq!(connection.source(), "loopback://plant");
        assert_eq!(connection.transport_profile(), TransportProfile::UdpUadp);

        config.address = NetworkAddress {
            url: "opc.udp://239.0.0.1:4840".into(),
            network_interface: String::new(),
        };
        let connection = LoopbackConnection::new(&config, bus, Arc::new(JsonCodec)).expect("valid");
        assert_eq!(connection.source(), "opc.udp://239.0.0.1:4840");
    }

    #[test]
    fn test_factory_rejects_unknown_profile() {
        let factory = LoopbackTransportFactory::new(LoopbackBus::default());
        let config = PubSubConnectionDataType::new("x", "http://example.com/amqp");
        let err = factory.create(&config).err().expect("unknown profile");
        assert!(matches!(err, PubSubError::UnsupportedTransport(_)));
    }

    #[test]
    fn test_no_discovery_before_start() {
        let config = PubSubConnectionDataType::new("idle", UDP_UADP_PROFILE_URI);
        let connection =
            LoopbackConnection::new(&config, LoopbackBus::default(), Arc::new(JsonCodec))
                .expect("valid");
        assert!(!connection.request_discovery(NetworkMessagePayload::PublisherEndpointsRequest));
        assert!(!connection.are_clients_connected());
    }
}
