// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DataSetMetaData configuration version computation (Part 14, 6.2.3.2.6).
//!
//! - Identical field lists keep the old version.
//! - Fields only appended at the end bump the minor version.
//! - Any other difference (removed, reordered or modified fields) bumps both.

use crate::types::{ConfigurationVersion, DataSetMetaData, FieldMetaData};
use chrono::{DateTime, TimeZone, Utc};

/// Version time of `time`: seconds since 2000-01-01 00:00:00 UTC.
pub fn version_time_at(time: DateTime<Utc>) -> u32 {
    let Some(epoch) = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).single() else {
        return 0;
    };
    let seconds = (time - epoch).num_seconds();
    u32::try_from(seconds.max(0)).unwrap_or(u32::MAX)
}

/// Version time of now.
pub fn version_time() -> u32 {
    version_time_at(Utc::now())
}

/// Version of `new_meta_data` given the previous metadata of the same DataSet.
pub fn calculate_configuration_version(
    old_meta_data: &DataSetMetaData,
    new_meta_data: &DataSetMetaData,
) -> ConfigurationVersion {
    let old_version = old_meta_data.configuration_version;
    let old_fields = &old_meta_data.fields;
    let new_fields = &new_meta_data.fields;

    let major_change = new_fields.len() < old_fields.len()
        || old_fields
            .iter()
            .zip(new_fields.iter())
            .any(|(old, new)| !same_field(old, new));

    if major_change {
        let time = next_version_time(old_version);
        return ConfigurationVersion::new(time, time);
    }
    if new_fields.len() > old_fields.len() {
        return ConfigurationVersion::new(old_version.major_version, next_version_time(old_version));
    }
    old_version
}

/// Now, but strictly after both halves of `previous`.
fn next_version_time(previous: ConfigurationVersion) -> u32 {
    let floor = previous
        .major_version
        .max(previous.minor_version)
        .saturating_add(1);
    version_time().max(floor)
}

fn same_field(old: &FieldMetaData, new: &FieldMetaData) -> bool {
    old.name == new.name
        && old.built_in_type == new.built_in_type
        && old.data_type == new.data_type
        && old.value_rank == new.value_rank
        && old.array_dimensions == new.array_dimensions
        && old.max_string_length == new.max_string_length
        && old.field_flags == new.field_flags
        && old.properties == new.properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuiltInType, KeyValuePair};

    fn meta(fields: &[(&str, BuiltInType)]) -> DataSetMetaData {
        let mut meta = DataSetMetaData::new(
            "Simple",
            fields
                .iter()
                .map(|(name, ty)| FieldMetaData::scalar(*name, *ty))
                .collect(),
        );
        meta.configuration_version = ConfigurationVersion::new(100, 200);
        meta
    }

    #[test]
    fn test_identical_fields_keep_version() {
        let old = meta(&[("A", BuiltInType::Int32), ("B", BuiltInType::Double)]);
        let new = meta(&[("A", BuiltInType::Int32), ("B", BuiltInType::Double)]);
        assert_eq!(
            calculate_configuration_version(&old, &new),
            ConfigurationVersion::new(100, 200)
        );
    }

    #[test]
    fn test_appended_field_bumps_minor() {
        let old = meta(&[("A", BuiltInType::Int32)]);
        let new = meta(&[("A", BuiltInType::Int32), ("B", BuiltInType::Double)]);
        let version = calculate_configuration_version(&old, &new);
        assert_eq!(version.major_version, 100);
        assert!(version.minor_version > 200);
    }

    #[test]
    fn test_removed_field_bumps_major() {
        let old = meta(&[("A", BuiltInType::Int32), ("B", BuiltInType::Double)]);
        let new = meta(&[("A", BuiltInType::Int32)]);
        let version = calculate_configuration_version(&old, &new);
        assert!(version.major_version > 100);
        assert_eq!(version.major_version, version.minor_version);
    }

    #[test]
    fn test_reordered_fields_bump_major() {
        let old = meta(&[("A", BuiltInType::Int32), ("B", BuiltInType::Double)]);
        let new = meta(&[("B", BuiltInType::Double), ("A", BuiltInType::Int32)]);
        assert!(calculate_configuration_version(&old, &new).major_version > 100);
    }

    #[test]
    fn test_changed_property_on_later_field_bumps_major() {
        let old = meta(&[
            ("A", BuiltInType::Int32),
            ("B", BuiltInType::Double),
            ("C", BuiltInType::String),
        ]);
        let mut new = old.clone();
        new.fields[2]
            .properties
            .push(KeyValuePair::new("EngineeringUnits", "degC"));
        assert!(calculate_configuration_version(&old, &new).major_version > 100);
    }

    #[test]
    fn test_version_time_epoch() {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(version_time_at(epoch), 0);
        let later = Utc.with_ymd_and_hms(2000, 1, 2, 0, 0, 0).unwrap();
        assert_eq!(version_time_at(later), 86_400);
        let before = Utc.with_ymd_and_hms(1999, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(version_time_at(before), 0);
    }

    #[test]
    fn test_versions_are_monotonic() {
        let mut old = meta(&[("A", BuiltInType::Int32)]);
        old.configuration_version = ConfigurationVersion::new(u32::MAX - 1, u32::MAX - 1);
        let new = meta(&[]);
        let version = calculate_configuration_version(&old, &new);
        assert_eq!(version.major_version, u32::MAX);
    }
}
