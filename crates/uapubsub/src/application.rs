// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PubSub application: composition root of the engine.
//!
//! The application owns the configurator, the data collector, the event hub
//! and one [`Connection`] per configured connection. It follows the
//! configurator:
//!
//! - a connection added to the configuration gets a transport from the
//!   [`ConnectionFactory`] registered for its transport profile, and is
//!   started right away when the application runs;
//! - a removed connection is stopped and dropped;
//! - PublishedDataSets and their extension fields are mirrored into the
//!   data collector;
//! - every other change is forwarded to the connections, which follow their
//!   writer groups.
//!
//! # Example
//!
//! ```ignore
//! use uapubsub::{LoopbackBus, PubSubApplication};
//!
//! let application = PubSubApplication::builder()
//!     .loopback(LoopbackBus::default())
//!     .configuration(config)
//!     .build()?;
//! application.start().await?;
//! ```

use crate::configurator::{
    ConfigId, ConfigKind, ConfigObject, ConfiguratorEvent, ConfiguratorListener,
    PubSubConfigurator,
};
use crate::connection::{Connection, ConnectionCore};
use crate::data_collector::{DataCollector, DataStore, InMemoryDataStore};
use crate::error::{PubSubError, Result};
use crate::events::{EventHub, PubSubEventListener};
use crate::transport::{ConnectionFactory, LoopbackBus, LoopbackTransportFactory};
use crate::types::{
    EndpointDescription, PubSubConfiguration, PubSubConnectionDataType, TransportProfile,
};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

/// Builder of a [`PubSubApplication`].
#[derive(Default)]
pub struct PubSubApplicationBuilder {
    application_id: Option<String>,
    data_store: Option<Arc<dyn DataStore>>,
    factories: HashMap<TransportProfile, Arc<dyn ConnectionFactory>>,
    configuration: Option<PubSubConfiguration>,
    publisher_endpoints: Vec<EndpointDescription>,
}

impl PubSubApplicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn application_id(mut self, id: impl Into<String>) -> Self {
        self.application_id = Some(id.into());
        self
    }

    /// Source of published values. Defaults to an [`InMemoryDataStore`].
    pub fn data_store(mut self, data_store: Arc<dyn DataStore>) -> Self {
        self.data_store = Some(data_store);
        self
    }

    /// Use `factory` for connections with transport `profile`.
    pub fn transport(
        mut self,
        profile: TransportProfile,
        factory: Arc<dyn ConnectionFactory>,
    ) -> Self {
        self.factories.insert(profile, factory);
        self
    }

    /// Run every transport profile over `bus`.
    pub fn loopback(mut self, bus: LoopbackBus) -> Self {
        let factory: Arc<dyn ConnectionFactory> = Arc::new(LoopbackTransportFactory::new(bus));
        for profile in TransportProfile::ALL {
            self.factories.insert(profile, factory.clone());
        }
        self
    }

    /// Configuration loaded when the application is built.
    pub fn configuration(mut self, configuration: PubSubConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Endpoints announced in answers to publisher endpoint requests.
    pub fn publisher_endpoints(mut self, endpoints: Vec<EndpointDescription>) -> Self {
        self.publisher_endpoints = endpoints;
        self
    }

    pub fn build(self) -> Result<Arc<PubSubApplication>> {
        let data_store = self
            .data_store
            .unwrap_or_else(|| Arc::new(InMemoryDataStore::new()));
        let application = Arc::new(PubSubApplication {
            application_id: self
                .application_id
                .unwrap_or_else(|| format!("uapubsub-{}", std::process::id())),
            configurator: Arc::new(PubSubConfigurator::new()),
            data_collector: Arc::new(DataCollector::new(data_store)),
            events: Arc::new(EventHub::new()),
            factories: self.factories,
            connections: RwLock::new(BTreeMap::new()),
            publisher_endpoints: Arc::new(RwLock::new(self.publisher_endpoints)),
            runtime: Mutex::new(None),
            running: AtomicBool::new(false),
        });
        application
            .configurator
            .add_listener(Arc::new(ConfiguratorBridge {
                application: Arc::downgrade(&application),
            }));

        if let Some(configuration) = self.configuration {
            application.load_configuration(configuration, true)?;
        }
        info!(
            "PubSub application '{}' created with {} connections",
            application.application_id,
            application.connections.read().len()
        );
        Ok(application)
    }
}

/// Forwards configurator events to the application without keeping it alive.
struct ConfiguratorBridge {
    application: Weak<PubSubApplication>,
}

impl ConfiguratorListener for ConfiguratorBridge {
    fn on_configurator_event(&self, event: &ConfiguratorEvent) {
        if let Some(application) = self.application.upgrade() {
            application.on_configurator_event(event);
        }
    }
}

/// A running PubSub engine.
pub struct PubSubApplication {
    application_id: String,
    configurator: Arc<PubSubConfigurator>,
    data_collector: Arc<DataCollector>,
    events: Arc<EventHub>,
    factories: HashMap<TransportProfile, Arc<dyn ConnectionFactory>>,
    connections: RwLock<BTreeMap<ConfigId, Arc<Connection>>>,
    publisher_endpoints: Arc<RwLock<Vec<EndpointDescription>>>,
    runtime: Mutex<Option<Handle>>,
    running: AtomicBool,
}

impl PubSubApplication {
    pub fn builder() -> PubSubApplicationBuilder {
        PubSubApplicationBuilder::new()
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn configurator(&self) -> &Arc<PubSubConfigurator> {
        &self.configurator
    }

    pub fn data_collector(&self) -> &Arc<DataCollector> {
        &self.data_collector
    }

    pub fn data_store(&self) -> &Arc<dyn DataStore> {
        self.data_collector.data_store()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn add_listener(&self, listener: Arc<dyn PubSubEventListener>) {
        self.events.add_listener(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PubSubEventListener>) {
        self.events.remove_listener(listener);
    }

    pub fn publisher_endpoints(&self) -> Vec<EndpointDescription> {
        self.publisher_endpoints.read().clone()
    }

    pub fn set_publisher_endpoints(&self, endpoints: Vec<EndpointDescription>) {
        *self.publisher_endpoints.write() = endpoints;
    }

    /// Profile of `uri` if a factory is registered for it.
    fn supported_profile(&self, uri: &str) -> Result<TransportProfile> {
        let profile: TransportProfile = uri.parse()?;
        if self.factories.contains_key(&profile) {
            Ok(profile)
        } else {
            Err(PubSubError::UnsupportedTransport(uri.to_string()))
        }
    }

    /// Validate and load `config`. Nothing changes when validation fails.
    pub fn load_configuration(
        &self,
        config: PubSubConfiguration,
        replace_existing: bool,
    ) -> Result<()> {
        config.validate()?;
        for connection in &config.connections {
            self.supported_profile(&connection.transport_profile_uri)?;
        }
        self.configurator.load_configuration(config, replace_existing)
    }

    /// Load a TOML configuration file, replacing the current configuration.
    pub fn load_configuration_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let config = PubSubConfiguration::from_file(path)?;
        self.load_configuration(config, true)
    }

    /// Add a connection after checking that its transport can be created.
    pub fn add_connection(&self, connection: PubSubConnectionDataType) -> Result<ConfigId> {
        self.supported_profile(&connection.transport_profile_uri)?;
        self.configurator.add_connection(connection)
    }

    pub fn connection(&self, id: ConfigId) -> Option<Arc<Connection>> {
        self.connections.read().get(&id).cloned()
    }

    /// Live connections ordered by id.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.read().values().cloned().collect()
    }

    /// Start every connection. Failed connections are logged and skipped.
    pub async fn start(&self) -> Result<()> {
        *self.runtime.lock() = Some(Handle::current());
        self.running.store(true, Ordering::SeqCst);

        let connections = self.connections();
        let mut failed = 0usize;
        for connection in &connections {
            if let Err(e) = connection.start().await {
                failed += 1;
                error!("Cannot start connection {}: {}", connection.connection_id(), e);
            }
        }
        info!(
            "PubSub application '{}' started ({} connections, {} failed)",
            self.application_id,
            connections.len(),
            failed
        );
        Ok(())
    }

    /// Stop every connection.
    pub async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        *self.runtime.lock() = None;

        for connection in self.connections() {
            if let Err(e) = connection.stop().await {
                warn!("Error while stopping connection {}: {}", connection.connection_id(), e);
            }
        }
        info!("PubSub application '{}' stopped", self.application_id);
        Ok(())
    }

    fn create_connection(
        &self,
        id: ConfigId,
        config: &PubSubConnectionDataType,
    ) -> Result<Arc<Connection>> {
        let profile = self.supported_profile(&config.transport_profile_uri)?;
        let factory = self.factories.get(&profile).ok_or_else(|| {
            PubSubError::UnsupportedTransport(config.transport_profile_uri.clone())
        })?;
        let transport = factory.create(config)?;
        let core = Arc::new(ConnectionCore::new(
            id,
            profile,
            self.configurator.clone(),
            self.data_collector.clone(),
            self.events.clone(),
            self.publisher_endpoints.clone(),
        ));
        Ok(Arc::new(Connection::new(core, transport)))
    }

    fn on_connection_added(&self, id: ConfigId, config: &PubSubConnectionDataType) {
        let connection = match self.create_connection(id, config) {
            Ok(connection) => connection,
            Err(e) => {
                error!("Cannot create transport for connection '{}': {}", config.name, e);
                return;
            }
        };
        self.connections.write().insert(id, connection.clone());
        debug!("Connection '{}' ({}) created", config.name, id);

        if !self.is_running() {
            return;
        }
        let handle = self.runtime.lock().clone();
        if let Some(handle) = handle {
            handle.spawn(async move {
                if let Err(e) = connection.start().await {
                    error!("Cannot start connection {}: {}", connection.connection_id(), e);
                }
            });
        }
    }

    fn on_connection_removed(&self, id: ConfigId) {
        let Some(connection) = self.connections.write().remove(&id) else {
            return;
        };
        debug!("Connection {} removed", id);
        if !connection.is_running() {
            return;
        }
        let handle = self.runtime.lock().clone();
        if let Some(handle) = handle {
            handle.spawn(async move {
                if let Err(e) = connection.stop().await {
                    warn!(
                        "Error while stopping connection {}: {}",
                        connection.connection_id(),
                        e
                    );
                }
            });
        }
    }

    /// Mirror the PublishedDataSet `id` into the data collector.
    fn refresh_published_data_set(&self, id: ConfigId) {
        match self.configurator.snapshot(id) {
            Some(ConfigObject::PublishedDataSet(pds)) => {
                self.data_collector.add_published_data_set(pds);
            }
            _ => debug!("PublishedDataSet {} no longer configured", id),
        }
    }

    fn on_configurator_event(&self, event: &ConfiguratorEvent) {
        match event {
            ConfiguratorEvent::Added {
                id,
                object: ConfigObject::Connection(config),
                ..
            } => self.on_connection_added(*id, config),
            ConfiguratorEvent::Removed {
                id,
                object: ConfigObject::Connection(_),
                ..
            } => self.on_connection_removed(*id),
            ConfiguratorEvent::Added {
                id,
                object: ConfigObject::PublishedDataSet(_),
                ..
            } => self.refresh_published_data_set(*id),
            ConfiguratorEvent::Removed {
                object: ConfigObject::PublishedDataSet(pds),
                ..
            } => {
                self.data_collector.remove_published_data_set(&pds.name);
            }
            ConfiguratorEvent::Added { parent_id, object, .. }
            | ConfiguratorEvent::Removed { parent_id, object, .. }
                if object.kind() == ConfigKind::ExtensionField =>
            {
                self.refresh_published_data_set(*parent_id);
            }
            _ => {}
        }

        for connection in self.connections() {
            connection.on_configurator_event(event);
        }
    }
}
