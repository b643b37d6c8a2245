//! Arrow schema for persisted statistics records.
//!
//! One row per saved `InventoryStatistics`. Counters are `UInt64`; the
//! metadata map is kept as a JSON string so it survives the round trip
//! exactly:
//! `{"documentType": {"label": "documentType", "counters": {"invoice": 2}}}`.

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// Directory name of the statistics table.
pub const TABLE_NAME: &str = "statistics";

/// Partition key stamped on every record.
pub const PARTITION_KEY: &str = "STATISTICS";

pub(crate) const RECORD_ID: &str = "record_id";
pub(crate) const PARTITION: &str = "partition_key";
pub(crate) const RECORDED_AT: &str = "recorded_at";
pub(crate) const START_TIME: &str = "inventory_start_time";
pub(crate) const COMPLETION_TIME: &str = "inventory_completion_time";
pub(crate) const METADATA_LIST: &str = "metadata_list";

/// Counter columns in schema order.
pub(crate) const COUNTER_COLUMNS: [&str; 10] = [
    "object_count",
    "total_object_size",
    "object_in_hot_count",
    "total_object_in_hot_size",
    "object_in_cool_count",
    "total_object_in_cool_size",
    "object_in_cold_count",
    "total_object_in_cold_size",
    "object_in_archive_count",
    "total_object_in_archive_size",
];

/// Helper to create a timestamp field (microseconds UTC).
fn timestamp_field(name: &str, nullable: bool) -> Field {
    Field::new(
        name,
        DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
        nullable,
    )
}

fn string_field(name: &str, nullable: bool) -> Field {
    Field::new(name, DataType::Utf8, nullable)
}

/// Schema for the `statistics` table.
pub fn statistics_schema() -> Schema {
    let mut fields = vec![
        // Record identity
        string_field(RECORD_ID, false),
        string_field(PARTITION, false),
        timestamp_field(RECORDED_AT, false),
        // Inventory run timing
        timestamp_field(START_TIME, false),
        timestamp_field(COMPLETION_TIME, false),
    ];
    fields.extend(
        COUNTER_COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::UInt64, false)),
    );
    fields.push(string_field(METADATA_LIST, false));
    Schema::new(fields)
}

/// Shared handle to the statistics schema.
pub fn statistics_schema_ref() -> Arc<Schema> {
    Arc::new(statistics_schema())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_schema_shape() {
        let schema = statistics_schema();
        assert_eq!(schema.fields().len(), 5 + COUNTER_COLUMNS.len() + 1);
        assert!(schema.field_with_name(RECORD_ID).is_ok());
        assert!(schema.field_with_name("total_object_in_archive_size").is_ok());

        let metadata = schema.field_with_name(METADATA_LIST).unwrap();
        assert_eq!(metadata.data_type(), &DataType::Utf8);
        assert!(!metadata.is_nullable());
    }

    #[test]
    fn test_counter_columns_are_unsigned() {
        let schema = statistics_schema();
        for name in COUNTER_COLUMNS {
            let field = schema.field_with_name(name).unwrap();
            assert_eq!(field.data_type(), &DataType::UInt64, "{name}");
        }
    }
}
