// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PubSub connections.
//!
//! A [`Connection`] ties together three parts:
//!
//! - a transport implementing [`PubSubConnection`] (sockets, broker, codec),
//! - a [`ConnectionCore`] with the transport independent publish/receive logic,
//! - one [`Publisher`] per writer group of the connection.
//!
//! Writer groups added to or removed from the configuration while the
//! connection runs get their publishers created/started or stopped/dropped
//! without a restart.

mod shared;

pub use shared::{ConnectionCore, DataSetWriterConfigurationResponse};

use crate::configurator::{ConfigId, ConfigKind, ConfiguratorEvent};
use crate::error::Result;
use crate::message::{NetworkMessage, NetworkMessagePayload};
use crate::publish_state::WriterGroupPublishState;
use crate::publisher::{Publisher, PublisherStatsSnapshot};
use crate::types::{TransportProfile, WriterGroupDataType};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Boxed future returned by transport start/stop.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport binding of a connection (UDP, MQTT, loopback, ...).
pub trait PubSubConnection: Send + Sync {
    fn transport_profile(&self) -> TransportProfile;

    /// Open sockets or broker sessions. Received bytes go to `core`.
    fn internal_start(&self, core: Arc<ConnectionCore>) -> BoxFuture<'_, Result<()>>;

    fn internal_stop(&self) -> BoxFuture<'_, Result<()>>;

    /// Pack the current data of `group` into network messages.
    ///
    /// Sequence numbers and keyframe/delta decisions must come from `state`,
    /// usually through [`ConnectionCore::create_data_set`].
    fn create_network_messages(
        &self,
        core: &ConnectionCore,
        group: &WriterGroupDataType,
        state: &WriterGroupPublishState,
    ) -> Result<Vec<NetworkMessage>>;

    /// Encode and send; `false` on ordinary send failures.
    fn publish_network_message(&self, message: &NetworkMessage) -> bool;

    fn are_clients_connected(&self) -> bool;

    /// Send a discovery request (metadata, writer configuration, endpoints).
    ///
    /// Transports without discovery support return `false`.
    fn request_discovery(&self, _request: NetworkMessagePayload) -> bool {
        false
    }
}

/// One live connection with its transport and publishers.
pub struct Connection {
    core: Arc<ConnectionCore>,
    transport: Arc<dyn PubSubConnection>,
    publishers: Mutex<BTreeMap<ConfigId, Publisher>>,
    runtime: Mutex<Option<Handle>>,
}

impl Connection {
    /// Connection with a publisher for every writer group already configured.
    pub fn new(core: Arc<ConnectionCore>, transport: Arc<dyn PubSubConnection>) -> Self {
        let connection = Self {
            core,
            transport,
            publishers: Mutex::new(BTreeMap::new()),
            runtime: Mutex::new(None),
        };
        let groups = connection
            .core
            .configurator()
            .children_of_kind(connection.connection_id(), ConfigKind::WriterGroup);
        for group in groups {
            connection.add_publisher(group);
        }
        connection
    }

    pub fn connection_id(&self) -> ConfigId {
        self.core.connection_id()
    }

    pub fn core(&self) -> &Arc<ConnectionCore> {
        &self.core
    }

    pub fn transport(&self) -> &Arc<dyn PubSubConnection> {
        &self.transport
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    pub fn are_clients_connected(&self) -> bool {
        self.transport.are_clients_connected()
    }

    /// Ask other publishers for metadata, writer configuration or endpoints.
    ///
    /// Answers arrive through the application's event listeners.
    pub fn request_discovery(&self, request: NetworkMessagePayload) -> bool {
        if !self.is_running() {
            return false;
        }
        self.transport.request_discovery(request)
    }

    /// Start the transport, then every publisher.
    pub async fn start(&self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        self.transport.internal_start(self.core.clone()).await?;
        self.core.set_running(true);

        // Held while setting the runtime so add_publisher cannot miss it.
        let handle = Handle::current();
        let publishers = self.publishers.lock();
        *self.runtime.lock() = Some(handle.clone());
        for publisher in publishers.values() {
            publisher.start(&handle);
        }
        drop(publishers);
        info!("Connection {} started", self.connection_id());
        Ok(())
    }

    /// Stop the transport, then every publisher.
    pub async fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.core.set_running(false);
        let result = self.transport.internal_stop().await;
        let publishers = self.publishers.lock();
        *self.runtime.lock() = None;
        for publisher in publishers.values() {
            publisher.stop();
        }
        drop(publishers);
        info!("Connection {} stopped", self.connection_id());
        result
    }

    fn add_publisher(&self, writer_group_id: ConfigId) {
        let Some(publisher) = Publisher::for_writer_group(
            writer_group_id,
            self.core.clone(),
            self.transport.clone(),
        ) else {
            warn!("No writer group {} to publish", writer_group_id);
            return;
        };
        let mut publishers = self.publishers.lock();
        if publishers.contains_key(&writer_group_id) {
            return;
        }
        if let Some(handle) = self.runtime.lock().as_ref() {
            publisher.start(handle);
        }
        debug!(
            "Connection {} publishes writer group {}",
            self.connection_id(),
            writer_group_id
        );
        publishers.insert(writer_group_id, publisher);
    }

    /// Follow writer groups added to or removed from this connection.
    pub fn on_configurator_event(&self, event: &ConfiguratorEvent) {
        match event {
            ConfiguratorEvent::Added {
                id,
                parent_id,
                object,
            } if *parent_id == self.connection_id()
                && object.kind() == ConfigKind::WriterGroup =>
            {
                self.add_publisher(*id);
            }
            ConfiguratorEvent::Removed { id, object, .. }
                if object.kind() == ConfigKind::WriterGroup =>
            {
                if let Some(publisher) = self.publishers.lock().remove(id) {
                    publisher.stop();
                }
            }
            _ => {}
        }
    }

    pub fn publisher_ids(&self) -> Vec<ConfigId> {
        self.publishers.lock().keys().copied().collect()
    }

    pub fn publisher_stats(&self, writer_group_id: ConfigId) -> Option<PublisherStatsSnapshot> {
        self.publishers
            .lock()
            .get(&writer_group_id)
            .map(Publisher::stats)
    }

    /// Run `f` with the publisher of `writer_group_id`.
    pub fn with_publisher<R>(
        &self,
        writer_group_id: ConfigId,
        f: impl FnOnce(&Publisher) -> R,
    ) -> Option<R> {
        self.publishers.lock().get(&writer_group_id).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::{ConfigObject, PubSubConfigurator, PubSubState};
    use crate::data_collector::{DataCollector, InMemoryDataStore};
    use crate::events::{EventHub, PubSubEventListener, RawDataReceivedEventArgs};
    use crate::types::{
        DataSetReaderDataType, PubSubConnectionDataType, PublisherId, ReaderGroupDataType,
        UDP_UADP_PROFILE_URI,
    };
    use parking_lot::RwLock;

    struct IdleTransport;

    impl PubSubConnection for IdleTransport {
        fn transport_profile(&self) -> TransportProfile {
            TransportProfile::UdpUadp
        }

        fn internal_start(&self, _core: Arc<ConnectionCore>) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn internal_stop(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Ok(()) })
        }

        fn create_network_messages(
            &self,
            _core: &ConnectionCore,
            _group: &WriterGroupDataType,
            _state: &WriterGroupPublishState,
        ) -> Result<Vec<NetworkMessage>> {
            Ok(Vec::new())
        }

        fn publish_network_message(&self, _message: &NetworkMessage) -> bool {
            true
        }

        fn are_clients_connected(&self) -> bool {
            false
        }
    }

    struct Fixture {
        configurator: Arc<PubSubConfigurator>,
        events: Arc<EventHub>,
        connection: Connection,
    }

    fn fixture() -> Fixture {
        let configurator = Arc::new(PubSubConfigurator::new());
        let mut config = PubSubConnectionDataType::new("C1", UDP_UADP_PROFILE_URI);
        config.publisher_id = PublisherId::UInt16(1);
        config
            .writer_groups
            .push(WriterGroupDataType::new("G1", 1, 50.0));
        let id = configurator.add_connection(config).expect("connection");

        let events = Arc::new(EventHub::new());
        let core = Arc::new(ConnectionCore::new(
            id,
            TransportProfile::UdpUadp,
            configurator.clone(),
            Arc::new(DataCollector::new(Arc::new(InMemoryDataStore::new()))),
            events.clone(),
            Arc::new(RwLock::new(Vec::new())),
        ));
        let connection = Connection::new(core, Arc::new(IdleTransport));
        Fixture {
            configurator,
            events,
            connection,
        }
    }

    fn add_group(f: &Fixture, name: &str, writer_group_id: u16) -> ConfigId {
        let id = f
            .configurator
            .add_writer_group(
                f.connection.connection_id(),
                WriterGroupDataType::new(name, writer_group_id, 50.0),
            )
            .expect("group");
        announce(f, id);
        id
    }

    /// Deliver the configurator's `Added` event for `id` to the connection.
    fn announce(f: &Fixture, id: ConfigId) {
        if let Some(object) = f.configurator.find_object_by_id(id) {
            f.connection.on_configurator_event(&ConfiguratorEvent::Added {
                id,
                parent_id: f.connection.connection_id(),
                object,
            });
        }
    }

    fn running(f: &Fixture, id: ConfigId) -> bool {
        f.connection
            .with_publisher(id, Publisher::is_running)
            .expect("publisher")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_publishers_follow_start_and_stop() {
        let f = fixture();
        let first = f.connection.publisher_ids()[0];
        let stopped = add_group(&f, "G2", 2);
        assert!(!running(&f, first));
        assert!(!running(&f, stopped));

        f.connection.start().await.expect("start");
        assert!(running(&f, first));
        assert!(running(&f, stopped));

        let started = add_group(&f, "G3", 3);
        assert!(running(&f, started));
        // A repeated Added event keeps the running publisher.
        announce(&f, started);
        assert_eq!(f.connection.publisher_ids().len(), 3);
        assert!(running(&f, started));

        f.connection.stop().await.expect("stop");
        assert!(f
            .connection
            .publisher_ids()
            .iter()
            .all(|id| !running(&f, *id)));
    }

    struct HandleRaw;

    impl PubSubEventListener for HandleRaw {
        fn on_raw_data_received(&self, args: &mut RawDataReceivedEventArgs) {
            assert_eq!(args.connection.name, "C1");
            args.handled = true;
        }
    }

    #[test]
    fn test_raw_data_without_listeners_is_passed_through() {
        let f = fixture();
        let core = f.connection.core();
        assert_eq!(
            core.raise_raw_data_received(vec![1, 2, 3], "test"),
            Some(vec![1, 2, 3])
        );

        f.events.add_listener(Arc::new(HandleRaw));
        assert_eq!(core.raise_raw_data_received(vec![1, 2, 3], "test"), None);
    }

    #[test]
    fn test_operational_readers_need_three_operational_levels() {
        let f = fixture();
        let connection_id = f.connection.connection_id();
        let group = f
            .configurator
            .add_reader_group(connection_id, ReaderGroupDataType::new("R1"))
            .expect("reader group");
        let reader = f
            .configurator
            .add_data_set_reader(
                group,
                DataSetReaderDataType::new("DR1", PublisherId::UInt16(1), 1, 1),
            )
            .expect("reader");
        let core = f.connection.core();
        assert_eq!(core.operational_data_set_readers().len(), 1);

        f.configurator.disable(reader).expect("disable reader");
        assert!(core.operational_data_set_readers().is_empty());
        f.configurator.enable(reader).expect("enable reader");

        f.configurator.disable(group).expect("disable group");
        assert_eq!(f.configurator.find_state_for_id(reader), PubSubState::Paused);
        assert!(core.operational_data_set_readers().is_empty());
        f.configurator.enable(group).expect("enable group");

        f.configurator.disable(connection_id).expect("disable connection");
        assert!(core.operational_data_set_readers().is_empty());
        f.configurator.enable(connection_id).expect("enable connection");
        assert_eq!(core.operational_data_set_readers().len(), 1);
    }
}
