// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport bindings.
//!
//! The application creates one transport per configured connection through
//! the [`ConnectionFactory`] registered for the connection's
//! [`TransportProfile`](crate::types::TransportProfile). Socket based
//! bindings live outside this crate; [`loopback`] provides an in-process
//! binding for tests and tools.

pub mod loopback;

pub use loopback::{LoopbackBus, LoopbackConnection, LoopbackFrame, LoopbackTransportFactory};

use crate::connection::PubSubConnection;
use crate::error::Result;
use crate::types::PubSubConnectionDataType;
use std::sync::Arc;

/// Creates the transport of a connection.
pub trait ConnectionFactory: Send + Sync {
    fn create(&self, connection: &PubSubConnectionDataType) -> Result<Arc<dyn PubSubConnection>>;
}

impl<F> ConnectionFactory for F
where
    F: Fn(&PubSubConnectionDataType) -> Result<Arc<dyn PubSubConnection>> + Send + Sync,
{
    fn create(&self, connection: &PubSubConnectionDataType) -> Result<Arc<dyn PubSubConnection>> {
        self(connection)
    }
}
