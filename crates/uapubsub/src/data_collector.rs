// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sampling of PublishedDataSets from a data store.
//!
//! Field `i` of a DataSet is taken, in order of preference, from:
//! 1. an extension field whose key equals the field name (constant value),
//! 2. the store entry of `published_data[i]`,
//! 3. `BadNoDataAvailable`.
//!
//! A bad value is replaced by the variable's substitute value, if any, with
//! status `UncertainSubstituteValue`.

use crate::data_set::{DataSet, Field};
use crate::types::{
    DataValue, PublishedDataSetDataType, PublishedVariable, StatusCode, VALUE_ATTRIBUTE_ID,
};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe source of published values.
///
/// Read by every publish cycle and written by arbitrary producers, possibly
/// concurrently.
pub trait DataStore: Send + Sync {
    fn write_value(&self, node_id: &str, attribute_id: u32, value: DataValue);
    fn read_value(&self, node_id: &str, attribute_id: u32) -> Option<DataValue>;
}

/// [`DataStore`] kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryDataStore {
    values: DashMap<(String, u32), DataValue>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the Value attribute of `node_id`.
    pub fn write(&self, node_id: &str, value: DataValue) {
        self.write_value(node_id, VALUE_ATTRIBUTE_ID, value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl DataStore for InMemoryDataStore {
    fn write_value(&self, node_id: &str, attribute_id: u32, value: DataValue) {
        self.values.insert((node_id.to_string(), attribute_id), value);
    }

    fn read_value(&self, node_id: &str, attribute_id: u32) -> Option<DataValue> {
        self.values
            .get(&(node_id.to_string(), attribute_id))
            .map(|v| v.value().clone())
    }
}

/// Builds [`DataSet`]s for the PublishedDataSets it knows about.
pub struct DataCollector {
    data_store: Arc<dyn DataStore>,
    data_sets: DashMap<String, PublishedDataSetDataType>,
}

impl DataCollector {
    pub fn new(data_store: Arc<dyn DataStore>) -> Self {
        Self {
            data_store,
            data_sets: DashMap::new(),
        }
    }

    pub fn data_store(&self) -> &Arc<dyn DataStore> {
        &self.data_store
    }

    /// Add or replace a PublishedDataSet, keyed by name.
    pub fn add_published_data_set(&self, data_set: PublishedDataSetDataType) {
        debug!("DataCollector tracks PublishedDataSet '{}'", data_set.name);
        self.data_sets.insert(data_set.name.clone(), data_set);
    }

    pub fn remove_published_data_set(&self, name: &str) -> Option<PublishedDataSetDataType> {
        self.data_sets.remove(name).map(|(_, pds)| pds)
    }

    pub fn published_data_set(&self, name: &str) -> Option<PublishedDataSetDataType> {
        self.data_sets.get(name).map(|pds| pds.value().clone())
    }

    /// Current values of the PublishedDataSet `name`, `None` if unknown.
    pub fn collect_data(&self, name: &str) -> Option<DataSet> {
        let pds = self.data_sets.get(name)?;
        let meta = &pds.data_set_meta_data;

        let fields = meta
            .fields
            .iter()
            .enumerate()
            .map(|(index, field_meta)| {
                let constant = pds
                    .extension_fields
                    .iter()
                    .find(|ext| ext.key == field_meta.name)
                    .map(|ext| DataValue::new(ext.value.clone()));
                let value = match constant {
                    Some(value) => value,
                    None => self.sample(pds.published_data.get(index)),
                };
                Some(Field {
                    value,
                    field_meta_data: Some(field_meta.clone()),
                })
            })
            .collect();

        Some(DataSet {
            name: pds.name.clone(),
            fields,
            data_set_meta_data: Some(meta.clone()),
            ..DataSet::default()
        })
    }

    fn sample(&self, variable: Option<&PublishedVariable>) -> DataValue {
        let Some(variable) = variable else {
            return DataValue::from_status(StatusCode::BAD_NO_DATA_AVAILABLE);
        };
        let value = self
            .data_store
            .read_value(&variable.published_variable, variable.attribute_id)
            .unwrap_or_else(|| DataValue::from_status(StatusCode::BAD_NO_DATA_AVAILABLE));

        if value.status.is_bad() && !variable.substitute_value.is_null() {
            DataValue {
                value: variable.substitute_value.clone(),
                status: StatusCode::UNCERTAIN_SUBSTITUTE_VALUE,
                ..value
            }
        } else {
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuiltInType, DataSetMetaData, FieldMetaData, KeyValuePair, Variant};

    fn collector() -> (Arc<InMemoryDataStore>, DataCollector) {
        let store = Arc::new(InMemoryDataStore::new());
        let collector = DataCollector::new(store.clone());

        let meta = DataSetMetaData::new(
            "Simple",
            vec![
                FieldMetaData::scalar("Temperature", BuiltInType::Double),
                FieldMetaData::scalar("Pressure", BuiltInType::Double),
                FieldMetaData::scalar("Site", BuiltInType::String),
                FieldMetaData::scalar("Orphan", BuiltInType::Int32),
            ],
        );
        let mut pds = PublishedDataSetDataType::new("Simple", meta);
        pds.published_data = vec![
            PublishedVariable::new("ns=1;s=Temperature"),
            PublishedVariable::new("ns=1;s=Pressure").with_substitute(1.0_f64),
            PublishedVariable::new("ns=1;s=Site"),
        ];
        pds.extension_fields
            .push(KeyValuePair::new("Site", "Plant 1"));
        collector.add_published_data_set(pds);
        (store, collector)
    }

    #[test]
    fn test_collect_reads_store_and_extension_fields() {
        let (store, collector) = collector();
        store.write("ns=1;s=Temperature", DataValue::new(21.5_f64));

        let data_set = collector.collect_data("Simple").expect("known data set");
        assert_eq!(data_set.fields.len(), 4);

        let temperature = data_set.fields[0].as_ref().expect("field");
        assert_eq!(temperature.value.value, Variant::Double(21.5));
        assert!(temperature.value.status.is_good());

        let site = data_set.fields[2].as_ref().expect("field");
        assert_eq!(site.value.value, Variant::String("Plant 1".into()));

        assert_eq!(
            data_set.data_set_meta_data.as_ref().map(|m| m.fields.len()),
            Some(4)
        );
    }

    #[test]
    fn test_missing_values() {
        let (_store, collector) = collector();
        let data_set = collector.collect_data("Simple").expect("known data set");

        let temperature = data_set.fields[0].as_ref().expect("field");
        assert_eq!(temperature.value.status, StatusCode::BAD_NO_DATA_AVAILABLE);

        let pressure = data_set.fields[1].as_ref().expect("field");
        assert_eq!(pressure.value.status, StatusCode::UNCERTAIN_SUBSTITUTE_VALUE);
        assert_eq!(pressure.value.value, Variant::Double(1.0));

        let orphan = data_set.fields[3].as_ref().expect("field");
        assert_eq!(orphan.value.status, StatusCode::BAD_NO_DATA_AVAILABLE);
    }

    #[test]
    fn test_unknown_and_removed_data_sets() {
        let (_store, collector) = collector();
        assert!(collector.collect_data("Nope").is_none());
        assert!(collector.remove_published_data_set("Simple").is_some());
        assert!(collector.collect_data("Simple").is_none());
    }
}
