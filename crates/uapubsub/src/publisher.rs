// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Writer group publisher.
//!
//! A [`Publisher`] drives one writer group of one connection: its
//! [`IntervalRunner`] ticks at the group's publishing interval, asks the
//! connection whether the group may publish, and if so builds and sends the
//! group's network messages. Failures are logged and counted; a bad cycle
//! never stops the publisher.

use crate::configurator::ConfigId;
use crate::connection::{ConnectionCore, PubSubConnection};
use crate::interval_runner::{CanExecuteFn, IntervalAction, IntervalRunner};
use crate::publish_state::WriterGroupPublishState;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tracing::{error, info, warn};

/// Counters of one publisher.
#[derive(Debug)]
pub struct PublisherStats {
    /// Cycles in which messages were built.
    pub cycles: AtomicU64,

    /// Network messages handed to the transport successfully.
    pub messages_published: AtomicU64,

    /// Network messages the transport failed to send.
    pub send_failures: AtomicU64,

    /// Cycles aborted by an error or a panic.
    pub cycle_errors: AtomicU64,

    created: Instant,
}

impl Default for PublisherStats {
    fn default() -> Self {
        Self {
            cycles: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            cycle_errors: AtomicU64::new(0),
            created: Instant::now(),
        }
    }
}

impl PublisherStats {
    pub fn snapshot(&self) -> PublisherStatsSnapshot {
        PublisherStatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            cycle_errors: self.cycle_errors.load(Ordering::Relaxed),
            uptime_secs: self.created.elapsed().as_secs(),
        }
    }
}

/// Snapshot of publisher statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherStatsSnapshot {
    pub cycles: u64,
    pub messages_published: u64,
    pub send_failures: u64,
    pub cycle_errors: u64,
    pub uptime_secs: u64,
}

struct PublishCycle {
    writer_group_id: ConfigId,
    core: Arc<ConnectionCore>,
    transport: Arc<dyn PubSubConnection>,
    state: WriterGroupPublishState,
    stats: PublisherStats,
}

impl PublishCycle {
    fn can_publish(&self) -> bool {
        self.core.can_publish(self.writer_group_id)
    }

    fn publish_messages(&self) {
        let result = catch_unwind(AssertUnwindSafe(|| self.publish_messages_inner()));
        if result.is_err() {
            self.stats.cycle_errors.fetch_add(1, Ordering::Relaxed);
            error!(
                "Publish cycle of writer group {} panicked",
                self.writer_group_id
            );
        }
    }

    fn publish_messages_inner(&self) {
        let Some(group) = self
            .core
            .configurator()
            .writer_group(self.writer_group_id)
        else {
            warn!("Writer group {} no longer exists", self.writer_group_id);
            return;
        };
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);

        let messages = match self
            .transport
            .create_network_messages(&self.core, &group, &self.state)
        {
            Ok(messages) => messages,
            Err(e) => {
                self.stats.cycle_errors.fetch_add(1, Ordering::Relaxed);
                error!(
                    "Cannot create network messages for writer group '{}': {}",
                    group.name, e
                );
                return;
            }
        };

        for message in messages {
            if !self.transport.publish_network_message(&message) {
                self.stats.send_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Failed to publish a network message of writer group '{}'",
                    group.name
                );
                continue;
            }
            self.stats.messages_published.fetch_add(1, Ordering::Relaxed);

            for data_set_message in message.data_set_messages() {
                let writer = group
                    .data_set_writers
                    .iter()
                    .find(|w| w.data_set_writer_id == data_set_message.data_set_writer_id);
                if let Some(writer) = writer {
                    self.state
                        .on_message_published(writer, &data_set_message.data_set);
                }
            }
        }
    }
}

/// Periodic publisher of one writer group.
pub struct Publisher {
    cycle: Arc<PublishCycle>,
    runner: IntervalRunner,
}

impl Publisher {
    pub fn new(
        writer_group_id: ConfigId,
        publishing_interval: Duration,
        core: Arc<ConnectionCore>,
        transport: Arc<dyn PubSubConnection>,
    ) -> Self {
        let cycle = Arc::new(PublishCycle {
            writer_group_id,
            core,
            transport,
            state: WriterGroupPublishState::new(),
            stats: PublisherStats::default(),
        });

        let can_execute = {
            let cycle = cycle.clone();
            Arc::new(move || cycle.can_publish()) as CanExecuteFn
        };
        let action = {
            let cycle = cycle.clone();
            Arc::new(move || cycle.publish_messages()) as IntervalAction
        };
        let runner = IntervalRunner::new(
            format!("WriterGroup {}", writer_group_id),
            publishing_interval,
            Some(can_execute),
            Some(action),
        );

        Self { cycle, runner }
    }

    /// Publisher of `writer_group_id` using the group's configured interval.
    pub fn for_writer_group(
        writer_group_id: ConfigId,
        core: Arc<ConnectionCore>,
        transport: Arc<dyn PubSubConnection>,
    ) -> Option<Self> {
        let group = core.configurator().writer_group(writer_group_id)?;
        let interval = if group.publishing_interval.is_finite() && group.publishing_interval > 0.0 {
            Duration::from_secs_f64(group.publishing_interval / 1000.0)
        } else {
            Duration::ZERO
        };
        Some(Self::new(writer_group_id, interval, core, transport))
    }

    pub fn writer_group_id(&self) -> ConfigId {
        self.cycle.writer_group_id
    }

    pub fn publishing_interval(&self) -> Duration {
        self.runner.interval()
    }

    pub fn publish_state(&self) -> &WriterGroupPublishState {
        &self.cycle.state
    }

    pub fn stats(&self) -> PublisherStatsSnapshot {
        self.cycle.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }

    /// Whether the group may publish right now.
    pub fn can_publish(&self) -> bool {
        self.cycle.can_publish()
    }

    /// Run one publish cycle on the calling thread.
    pub fn publish_messages(&self) {
        self.cycle.publish_messages();
    }

    pub fn start(&self, handle: &Handle) {
        if !self.runner.is_running() {
            info!(
                "Publisher for writer group {} started ({:?})",
                self.cycle.writer_group_id,
                self.runner.interval()
            );
        }
        self.runner.start(handle);
    }

    pub fn stop(&self) {
        if self.runner.is_running() {
            info!(
                "Publisher for writer group {} stopped",
                self.cycle.writer_group_id
            );
        }
        self.runner.stop();
    }
}
