// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per writer group publish bookkeeping.
//!
//! One [`WriterGroupPublishState`] exists per publisher. It keeps, for each
//! DataSetWriter id, the message counter driving keyframe/delta decisions, the
//! last published field values driving change suppression and the last seen
//! metadata version.
//!
//! Callers query `is_delta_frame` / `exclude_unchanged_fields` before sending
//! and report with `on_message_published` afterwards, in the same order.

use crate::data_set::DataSet;
use crate::types::{ConfigurationVersion, DataSetMetaData, DataSetWriterDataType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct DataSetState {
    message_count: u32,
    last_data_set: Option<DataSet>,
    configuration_version: Option<ConfigurationVersion>,
    last_meta_data_update: Option<Instant>,
}

/// Sequencing, delta and metadata state of one writer group.
#[derive(Debug, Default)]
pub struct WriterGroupPublishState {
    data_set_states: Mutex<HashMap<u16, DataSetState>>,
    network_message_sequence: AtomicU16,
}

impl WriterGroupPublishState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the next network message of this group, starting at 1.
    pub fn next_network_message_sequence_number(&self) -> u16 {
        self.network_message_sequence
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1)
    }

    /// Whether the next message of `writer` is a delta frame, and its sequence number.
    ///
    /// Every `key_frame_count`-th message, starting with the first, is a keyframe.
    pub fn is_delta_frame(&self, writer: &DataSetWriterDataType) -> (bool, u32) {
        let mut states = self.data_set_states.lock();
        let state = states.entry(writer.data_set_writer_id).or_default();
        let sequence_number = state.message_count.wrapping_add(1);
        let delta = writer.key_frame_count > 1 && state.message_count % writer.key_frame_count != 0;
        (delta, sequence_number)
    }

    /// `true` on the first metadata seen for `writer` and on every version change.
    pub fn has_meta_data_changed(
        &self,
        writer: &DataSetWriterDataType,
        meta_data: Option<&DataSetMetaData>,
    ) -> bool {
        let Some(meta_data) = meta_data else {
            return false;
        };
        let mut states = self.data_set_states.lock();
        let state = states.entry(writer.data_set_writer_id).or_default();
        if state.configuration_version == Some(meta_data.configuration_version) {
            return false;
        }
        state.configuration_version = Some(meta_data.configuration_version);
        state.last_meta_data_update = Some(Instant::now());
        true
    }

    /// `true` when `writer.meta_data_update_time` has elapsed since metadata was last sent.
    ///
    /// A zero update time means metadata is only sent on change. Returning
    /// `true` restarts the period.
    pub fn is_meta_data_update_due(&self, writer: &DataSetWriterDataType) -> bool {
        if writer.meta_data_update_time.is_nan() || writer.meta_data_update_time <= 0.0 {
            return false;
        }
        let period = Duration::from_secs_f64(writer.meta_data_update_time / 1000.0);
        let now = Instant::now();

        let mut states = self.data_set_states.lock();
        let state = states.entry(writer.data_set_writer_id).or_default();
        let due = state
            .last_meta_data_update
            .map_or(true, |last| now.duration_since(last) >= period);
        if due {
            state.last_meta_data_update = Some(now);
        }
        due
    }

    /// Drop the fields of `data_set` that did not change since they were last published.
    ///
    /// The first data set seen for a writer is kept whole and becomes the
    /// reference. Returns `None` when no field changed; nothing should be sent.
    pub fn exclude_unchanged_fields(
        &self,
        writer: &DataSetWriterDataType,
        mut data_set: DataSet,
    ) -> Option<DataSet> {
        let mut states = self.data_set_states.lock();
        let state = states.entry(writer.data_set_writer_id).or_default();

        let Some(last) = &state.last_data_set else {
            state.last_data_set = Some(data_set.clone());
            return Some(data_set);
        };
        if last.fields.len() != data_set.fields.len() {
            state.last_data_set = Some(data_set.clone());
            return Some(data_set);
        }

        let mut changed = false;
        for (slot, previous) in data_set.fields.iter_mut().zip(&last.fields) {
            let Some(field) = slot else {
                continue;
            };
            match previous {
                Some(previous) if previous.same_value(field) => *slot = None,
                _ => changed = true,
            }
        }
        changed.then_some(data_set)
    }

    /// Record that `data_set` was sent for `writer`.
    pub fn on_message_published(&self, writer: &DataSetWriterDataType, data_set: &DataSet) {
        let mut states = self.data_set_states.lock();
        let state = states.entry(writer.data_set_writer_id).or_default();
        state.message_count = state.message_count.wrapping_add(1);

        if writer.key_frame_count <= 1 {
            return;
        }
        if let Some(meta) = &data_set.data_set_meta_data {
            state.configuration_version = Some(meta.configuration_version);
        }
        match &mut state.last_data_set {
            Some(last) if last.fields.len() == data_set.fields.len() => {
                for (kept, sent) in last.fields.iter_mut().zip(&data_set.fields) {
                    if sent.is_some() {
                        kept.clone_from(sent);
                    }
                }
            }
            slot => *slot = Some(data_set.clone()),
        }
    }

    /// Messages published so far by `writer`.
    pub fn message_count(&self, data_set_writer_id: u16) -> u32 {
        self.data_set_states
            .lock()
            .get(&data_set_writer_id)
            .map_or(0, |s| s.message_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_set::Field;
    use crate::types::{DataValue, StatusCode, Variant};

    fn writer(key_frame_count: u32) -> DataSetWriterDataType {
        DataSetWriterDataType::new("Writer1", 1, "Simple").with_key_frame_count(key_frame_count)
    }

    fn data_set(values: &[i32]) -> DataSet {
        DataSet::new(
            "Simple",
            values
                .iter()
                .map(|v| Field::new(DataValue::new(Variant::Int32(*v))))
                .collect(),
        )
    }

    #[test]
    fn test_key_frame_cadence() {
        let state = WriterGroupPublishState::new();
        let writer = writer(3);
        let mut flags = Vec::new();
        let mut sequence_numbers = Vec::new();
        for _ in 0..6 {
            let (delta, seq) = state.is_delta_frame(&writer);
            flags.push(delta);
            sequence_numbers.push(seq);
            state.on_message_published(&writer, &data_set(&[1]));
        }
        assert_eq!(flags, vec![false, true, true, false, true, true]);
        assert_eq!(sequence_numbers, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_key_frame_count_one_or_zero_never_delta() {
        for count in [0, 1] {
            let state = WriterGroupPublishState::new();
            let writer = writer(count);
            for _ in 0..3 {
                assert!(!state.is_delta_frame(&writer).0);
                state.on_message_published(&writer, &data_set(&[1]));
            }
        }
    }

    #[test]
    fn test_is_delta_frame_does_not_count() {
        let state = WriterGroupPublishState::new();
        let writer = writer(2);
        assert_eq!(state.is_delta_frame(&writer), (false, 1));
        assert_eq!(state.is_delta_frame(&writer), (false, 1));
        assert_eq!(state.message_count(1), 0);
    }

    #[test]
    fn test_unchanged_data_set_is_suppressed() {
        let state = WriterGroupPublishState::new();
        let writer = writer(4);

        let first = state
            .exclude_unchanged_fields(&writer, data_set(&[1, 2, 3]))
            .expect("first data set is sent whole");
        assert_eq!(first.present_field_count(), 3);

        assert!(state
            .exclude_unchanged_fields(&writer, data_set(&[1, 2, 3]))
            .is_none());

        state.on_message_published(&writer, &first);
        assert!(state
            .exclude_unchanged_fields(&writer, data_set(&[1, 2, 3]))
            .is_none());
    }

    #[test]
    fn test_only_changed_field_is_kept() {
        let state = WriterGroupPublishState::new();
        let writer = writer(4);
        state.exclude_unchanged_fields(&writer, data_set(&[1, 2, 3]));

        let delta = state
            .exclude_unchanged_fields(&writer, data_set(&[1, 20, 3]))
            .expect("one field changed");
        assert!(delta.fields[0].is_none());
        assert!(delta.fields[2].is_none());
        let changed = delta.fields[1].as_ref().expect("changed field");
        assert_eq!(changed.value.value, Variant::Int32(20));
    }

    #[test]
    fn test_status_change_counts_as_change() {
        let state = WriterGroupPublishState::new();
        let writer = writer(4);
        state.exclude_unchanged_fields(&writer, data_set(&[1]));

        let mut next = data_set(&[1]);
        if let Some(field) = next.fields[0].as_mut() {
            field.value.status = StatusCode::UNCERTAIN_SUBSTITUTE_VALUE;
        }
        assert!(state.exclude_unchanged_fields(&writer, next).is_some());
    }

    #[test]
    fn test_published_deltas_merge_into_reference() {
        let state = WriterGroupPublishState::new();
        let writer = writer(4);
        let key = data_set(&[1, 2]);
        state.on_message_published(&writer, &key);

        let delta = state
            .exclude_unchanged_fields(&writer, data_set(&[1, 5]))
            .expect("changed");
        state.on_message_published(&writer, &delta);

        // [1, 5] is now the reference
        assert!(state
            .exclude_unchanged_fields(&writer, data_set(&[1, 5]))
            .is_none());
        assert!(state
            .exclude_unchanged_fields(&writer, data_set(&[2, 5]))
            .is_some());
    }

    #[test]
    fn test_meta_data_changed() {
        let state = WriterGroupPublishState::new();
        let writer = writer(1);
        let mut meta = DataSetMetaData::new("Simple", Vec::new());
        meta.configuration_version = ConfigurationVersion::new(1, 1);

        assert!(!state.has_meta_data_changed(&writer, None));
        assert!(state.has_meta_data_changed(&writer, Some(&meta)));
        assert!(!state.has_meta_data_changed(&writer, Some(&meta)));

        meta.configuration_version.minor_version = 2;
        assert!(state.has_meta_data_changed(&writer, Some(&meta)));
    }

    #[test]
    fn test_meta_data_update_due() {
        let state = WriterGroupPublishState::new();
        let mut writer = writer(1);
        assert!(!state.is_meta_data_update_due(&writer));

        writer.meta_data_update_time = 60_000.0;
        assert!(state.is_meta_data_update_due(&writer));
        assert!(!state.is_meta_data_update_due(&writer));
    }

    #[test]
    fn test_writers_are_independent() {
        let state = WriterGroupPublishState::new();
        let a = writer(2);
        let mut b = writer(2);
        b.data_set_writer_id = 2;

        state.on_message_published(&a, &data_set(&[1]));
        assert_eq!(state.is_delta_frame(&a), (true, 2));
        assert_eq!(state.is_delta_frame(&b), (false, 1));
    }
}
