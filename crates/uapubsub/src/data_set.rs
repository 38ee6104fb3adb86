// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sampled DataSet values.

use crate::types::{DataSetMetaData, DataValue, FieldMetaData};
use serde::{Deserialize, Serialize};

/// One sampled field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub value: DataValue,
    #[serde(default)]
    pub field_meta_data: Option<FieldMetaData>,
}

impl Field {
    pub fn new(value: DataValue) -> Self {
        Self {
            value,
            field_meta_data: None,
        }
    }

    /// Same status and value; timestamps are ignored.
    pub fn same_value(&self, other: &Field) -> bool {
        self.value.status == other.value.status && self.value.value == other.value.value
    }
}

/// Values of a PublishedDataSet at one sampling instant.
///
/// A `None` field is absent, as in a delta frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataSet {
    pub name: String,
    pub fields: Vec<Option<Field>>,
    #[serde(default)]
    pub data_set_meta_data: Option<DataSetMetaData>,
    #[serde(default)]
    pub sequence_number: u32,
    #[serde(default)]
    pub is_delta_frame: bool,
    #[serde(default)]
    pub data_set_writer_id: u16,
}

impl DataSet {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields: fields.into_iter().map(Some).collect(),
            ..Self::default()
        }
    }

    /// Number of present fields.
    pub fn present_field_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{StatusCode, Variant};

    #[test]
    fn test_same_value_ignores_timestamps() {
        let a = Field::new(DataValue::new(Variant::Int32(5)));
        let mut b = a.clone();
        b.value.source_timestamp = None;
        assert!(a.same_value(&b));

        b.value.status = StatusCode::UNCERTAIN_SUBSTITUTE_VALUE;
        assert!(!a.same_value(&b));
    }

    #[test]
    fn test_present_field_count() {
        let mut data_set = DataSet::new(
            "ds",
            vec![
                Field::new(DataValue::new(Variant::Boolean(true))),
                Field::new(DataValue::new(Variant::Int32(1))),
            ],
        );
        assert_eq!(data_set.present_field_count(), 2);
        data_set.fields[0] = None;
        assert_eq!(data_set.present_field_count(), 1);
    }
}
