// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Application event surface.
//!
//! Connections report received traffic through an [`EventHub`], which fans
//! each event out to the registered [`PubSubEventListener`]s. A panicking
//! listener is logged and skipped; it never reaches the receive path.
//!
//! # Usage
//!
//! ```ignore
//! use uapubsub::{DataReceivedEventArgs, PubSubEventListener};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl PubSubEventListener for Printer {
//!     fn on_data_received(&self, args: &DataReceivedEventArgs) {
//!         println!("{} messages from {}", args.network_message.data_set_messages().len(), args.source);
//!     }
//! }
//!
//! application.add_listener(Arc::new(Printer));
//! ```

use crate::configurator::ConfigId;
use crate::message::NetworkMessage;
use crate::types::{
    DataSetMetaData, EndpointDescription, MessageMapping, PubSubConnectionDataType, PublisherId,
    StatusCode, TransportProtocol, WriterGroupDataType,
};
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Raw bytes received by a connection, before decoding.
#[derive(Debug, Clone)]
pub struct RawDataReceivedEventArgs {
    pub message: Vec<u8>,
    pub source: String,
    pub transport_protocol: TransportProtocol,
    pub message_mapping: MessageMapping,
    pub connection: PubSubConnectionDataType,
    /// Set by a listener to stop decoding of this message.
    pub handled: bool,
}

#[derive(Debug, Clone)]
pub struct DataReceivedEventArgs {
    pub network_message: NetworkMessage,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct MetaDataReceivedEventArgs {
    pub network_message: NetworkMessage,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct PublisherEndpointsReceivedEventArgs {
    pub publisher_id: PublisherId,
    pub endpoints: Vec<EndpointDescription>,
    pub status_code: StatusCode,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct DataSetWriterConfigurationReceivedEventArgs {
    pub data_set_writer_ids: Vec<u16>,
    pub configuration: Option<WriterGroupDataType>,
    pub publisher_id: PublisherId,
    pub status_codes: Vec<StatusCode>,
    pub source: String,
}

/// Configuration property about to be changed by received traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationProperty {
    DataSetMetaData,
}

/// A received message is about to change a configuration object.
#[derive(Debug, Clone)]
pub struct ConfigurationUpdatingEventArgs {
    pub changed_property: ConfigurationProperty,
    /// Object whose property changes, e.g. a DataSetReader.
    pub parent: ConfigId,
    pub new_value: DataSetMetaData,
    /// Set by a listener to keep the current value.
    pub cancel: bool,
}

/// Receiver of application events. All methods default to no-ops.
pub trait PubSubEventListener: Send + Sync {
    fn on_raw_data_received(&self, _args: &mut RawDataReceivedEventArgs) {}

    fn on_data_received(&self, _args: &DataReceivedEventArgs) {}

    fn on_meta_data_received(&self, _args: &MetaDataReceivedEventArgs) {}

    fn on_publisher_endpoints_received(&self, _args: &PublisherEndpointsReceivedEventArgs) {}

    fn on_data_set_writer_configuration_received(
        &self,
        _args: &DataSetWriterConfigurationReceivedEventArgs,
    ) {
    }

    fn on_configuration_updating(&self, _args: &mut ConfigurationUpdatingEventArgs) {}
}

/// Registered listeners plus panic-isolated fan-out.
#[derive(Default)]
pub struct EventHub {
    listeners: RwLock<Vec<Arc<dyn PubSubEventListener>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: Arc<dyn PubSubEventListener>) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PubSubEventListener>) {
        self.listeners.write().retain(|l| !Arc::ptr_eq(l, listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Call `f` on every listener; returns how many panicked.
    fn deliver(&self, event: &str, mut f: impl FnMut(&dyn PubSubEventListener)) -> usize {
        let listeners = self.listeners.read().clone();
        let mut errors = 0;
        for listener in &listeners {
            let result = catch_unwind(AssertUnwindSafe(|| f(listener.as_ref())));
            if result.is_err() {
                errors += 1;
                error!("PubSub listener panicked while handling {}", event);
            }
        }
        errors
    }

    pub fn raise_raw_data_received(&self, args: &mut RawDataReceivedEventArgs) -> usize {
        self.deliver("RawDataReceived", |l| l.on_raw_data_received(args))
    }

    pub fn raise_data_received(&self, args: &DataReceivedEventArgs) -> usize {
        self.deliver("DataReceived", |l| l.on_data_received(args))
    }

    pub fn raise_meta_data_received(&self, args: &MetaDataReceivedEventArgs) -> usize {
        self.deliver("MetaDataReceived", |l| l.on_meta_data_received(args))
    }

    pub fn raise_publisher_endpoints_received(
        &self,
        args: &PublisherEndpointsReceivedEventArgs,
    ) -> usize {
        self.deliver("PublisherEndpointsReceived", |l| {
            l.on_publisher_endpoints_received(args)
        })
    }

    pub fn raise_data_set_writer_configuration_received(
        &self,
        args: &DataSetWriterConfigurationReceivedEventArgs,
    ) -> usize {
        self.deliver("DataSetWriterConfigurationReceived", |l| {
            l.on_data_set_writer_configuration_received(args)
        })
    }

    pub fn raise_configuration_updating(&self, args: &mut ConfigurationUpdatingEventArgs) -> usize {
        self.deliver("ConfigurationUpdating", |l| l.on_configuration_updating(args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::NetworkMessagePayload;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Panicking;

    impl PubSubEventListener for Panicking {
        fn on_data_received(&self, _args: &DataReceivedEventArgs) {
            panic!("listener failure");
        }
    }

    #[derive(Default)]
    struct Counting {
        data: AtomicUsize,
    }

    impl PubSubEventListener for Counting {
        fn on_data_received(&self, _args: &DataReceivedEventArgs) {
            self.data.fetch_add(1, Ordering::SeqCst);
        }

        fn on_configuration_updating(&self, args: &mut ConfigurationUpdatingEventArgs) {
            args.cancel = true;
        }
    }

    fn data_args() -> DataReceivedEventArgs {
        DataReceivedEventArgs {
            network_message: NetworkMessage::discovery(
                PublisherId::Null,
                NetworkMessagePayload::PublisherEndpointsRequest,
            ),
            source: "test".into(),
        }
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let hub = EventHub::new();
        let counting = Arc::new(Counting::default());
        hub.add_listener(Arc::new(Panicking));
        hub.add_listener(counting.clone());

        assert_eq!(hub.raise_data_received(&data_args()), 1);
        assert_eq!(hub.raise_data_received(&data_args()), 1);
        assert_eq!(counting.data.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancellable_event() {
        let hub = EventHub::new();
        let listener: Arc<dyn PubSubEventListener> = Arc::new(Counting::default());
        hub.add_listener(listener.clone());

        let mut args = ConfigurationUpdatingEventArgs {
            changed_property: ConfigurationProperty::DataSetMetaData,
            parent: ConfigId::INVALID,
            new_value: DataSetMetaData::default(),
            cancel: false,
        };
        hub.raise_configuration_updating(&mut args);
        assert!(args.cancel);

        hub.remove_listener(&listener);
        assert_eq!(hub.listener_count(), 0);
    }
}
