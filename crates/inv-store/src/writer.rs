//! Append-only Parquet store for statistics records.
//!
//! Every save writes one single-row Parquet file under
//! `<base_dir>/statistics/year=YYYY/month=MM/day=DD/statistics_<record_id>.parquet`.
//! Files are written to a `.tmp` sibling and renamed into place, so readers
//! never observe a partial record and concurrent writers never share a file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, RecordBatch, StringArray, TimestampMicrosecondArray, UInt64Array,
};
use arrow::datatypes::{TimestampMicrosecondType, UInt64Type};
use chrono::{DateTime, Utc};
use inv_common::InventoryStatistics;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::{WriterProperties, WriterVersion};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::schema::{
    statistics_schema_ref, COMPLETION_TIME, COUNTER_COLUMNS, METADATA_LIST, PARTITION,
    PARTITION_KEY, RECORDED_AT, RECORD_ID, START_TIME, TABLE_NAME,
};
use crate::StatisticsStore;

/// Errors from statistics store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected record layout in {path}: {message}")]
    Schema { path: PathBuf, message: String },
}

/// Configuration for the Parquet store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory; the table lives in `<base_dir>/statistics`.
    pub base_dir: PathBuf,

    /// Compression codec.
    pub compression: Compression,
}

impl StoreConfig {
    /// Create config with defaults (zstd level 3).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        StoreConfig {
            base_dir: base_dir.into(),
            compression: ZstdLevel::try_new(3)
                .map(Compression::ZSTD)
                .unwrap_or(Compression::SNAPPY),
        }
    }

    /// Use snappy compression instead of zstd.
    pub fn with_snappy(mut self) -> Self {
        self.compression = Compression::SNAPPY;
        self
    }

    /// Directory holding the statistics table.
    pub fn table_dir(&self) -> PathBuf {
        self.base_dir.join(TABLE_NAME)
    }
}

/// One persisted record as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredStatistics {
    pub record_id: String,
    pub partition_key: String,
    pub recorded_at: DateTime<Utc>,
    pub statistics: InventoryStatistics,
}

/// Parquet-backed append-only statistics store.
#[derive(Debug, Clone)]
pub struct ParquetStatisticsStore {
    config: StoreConfig,
}

impl ParquetStatisticsStore {
    pub fn new(config: StoreConfig) -> Self {
        ParquetStatisticsStore { config }
    }

    /// Store rooted at `base_dir` with default settings.
    pub fn open(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(StoreConfig::new(base_dir))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Append one record, returning the stored row and the file it landed in.
    pub fn append(
        &self,
        statistics: &InventoryStatistics,
    ) -> Result<(StoredStatistics, PathBuf), StoreError> {
        let record = StoredStatistics {
            record_id: Uuid::new_v4().to_string(),
            partition_key: PARTITION_KEY.to_string(),
            recorded_at: Utc::now(),
            statistics: statistics.clone(),
        };
        let batch = record_batch(&record)?;
        let output_path = self.build_output_path(&record);

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = output_path.with_extension("parquet.tmp");
        if let Err(e) = self.write_file(&temp_path, &batch) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }
        atomic_rename(&temp_path, &output_path)?;

        Ok((record, output_path))
    }

    /// Read every persisted record, oldest first.
    pub fn read_all(&self) -> Result<Vec<StoredStatistics>, StoreError> {
        let mut records = Vec::new();
        for path in self.list_files()? {
            for batch in read_batches(&path)? {
                records.extend(decode_batch(&path, &batch)?);
            }
        }
        records.sort_by(|a, b| {
            a.recorded_at
                .cmp(&b.recorded_at)
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        Ok(records)
    }

    /// Read every persisted record as raw Arrow batches.
    pub fn read_batches(&self) -> Result<Vec<RecordBatch>, StoreError> {
        let mut batches = Vec::new();
        for path in self.list_files()? {
            batches.extend(read_batches(&path)?);
        }
        Ok(batches)
    }

    /// Committed Parquet files, sorted by path. In-flight `.tmp` files are
    /// ignored.
    pub fn list_files(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();
        let table_dir = self.config.table_dir();
        if table_dir.is_dir() {
            collect_parquet_files(&table_dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    fn write_file(&self, path: &Path, batch: &RecordBatch) -> Result<(), StoreError> {
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_writer_version(WriterVersion::PARQUET_2_0)
            .set_compression(self.config.compression)
            .set_dictionary_enabled(true)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(batch)?;
        writer.close()?;
        Ok(())
    }

    /// Build the output path with date partitioning.
    fn build_output_path(&self, record: &StoredStatistics) -> PathBuf {
        let at = record.recorded_at;
        self.config
            .table_dir()
            .join(format!("year={}", at.format("%Y")))
            .join(format!("month={}", at.format("%m")))
            .join(format!("day={}", at.format("%d")))
            .join(format!("{}_{}.parquet", TABLE_NAME, record.record_id))
    }
}

impl StatisticsStore for ParquetStatisticsStore {
    fn save(&self, statistics: &InventoryStatistics) -> bool {
        match self.append(statistics) {
            Ok((record, path)) => {
                info!(
                    record_id = %record.record_id,
                    path = %path.display(),
                    object_count = statistics.object_count,
                    "statistics saved"
                );
                true
            }
            Err(e) => {
                error!(
                    dir = %self.config.table_dir().display(),
                    error = %e,
                    "failed to save statistics"
                );
                false
            }
        }
    }
}

/// Helper to rename temp file to final path atomically.
pub fn atomic_rename(temp_path: &Path, final_path: &Path) -> Result<(), StoreError> {
    fs::rename(temp_path, final_path)?;
    Ok(())
}

fn collect_parquet_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_parquet_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "parquet") {
            files.push(path);
        }
    }
    Ok(())
}

fn read_batches(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    debug!(path = %path.display(), "reading statistics file");
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }
    Ok(batches)
}

fn record_batch(record: &StoredStatistics) -> Result<RecordBatch, StoreError> {
    let stats = &record.statistics;
    let counters = [
        stats.object_count,
        stats.total_object_size,
        stats.object_in_hot_count,
        stats.total_object_in_hot_size,
        stats.object_in_cool_count,
        stats.total_object_in_cool_size,
        stats.object_in_cold_count,
        stats.total_object_in_cold_size,
        stats.object_in_archive_count,
        stats.total_object_in_archive_size,
    ];
    let metadata_json = serde_json::to_string(&stats.metadata_list)?;

    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec![record.record_id.as_str()])),
        Arc::new(StringArray::from(vec![record.partition_key.as_str()])),
        timestamp_array(record.recorded_at),
        timestamp_array(stats.inventory_start_time),
        timestamp_array(stats.inventory_completion_time),
    ];
    columns.extend(
        counters
            .iter()
            .map(|v| Arc::new(UInt64Array::from(vec![*v])) as ArrayRef),
    );
    columns.push(Arc::new(StringArray::from(vec![metadata_json])));

    Ok(RecordBatch::try_new(statistics_schema_ref(), columns)?)
}

fn timestamp_array(at: DateTime<Utc>) -> ArrayRef {
    Arc::new(TimestampMicrosecondArray::from(vec![at.timestamp_micros()]).with_timezone("UTC"))
}

fn decode_batch(path: &Path, batch: &RecordBatch) -> Result<Vec<StoredStatistics>, StoreError> {
    let columns = BatchColumns { path, batch };
    let record_ids = columns.strings(RECORD_ID)?;
    let partitions = columns.strings(PARTITION)?;
    let recorded = columns.timestamps(RECORDED_AT)?;
    let starts = columns.timestamps(START_TIME)?;
    let completions = columns.timestamps(COMPLETION_TIME)?;
    let metadata = columns.strings(METADATA_LIST)?;
    let counters = COUNTER_COLUMNS
        .iter()
        .map(|name| columns.counters(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let counter = |idx: usize| counters[idx].value(row);
        let mut statistics = InventoryStatistics::new(
            columns.to_datetime(starts.value(row))?,
            columns.to_datetime(completions.value(row))?,
        );
        statistics.object_count = counter(0);
        statistics.total_object_size = counter(1);
        statistics.object_in_hot_count = counter(2);
        statistics.total_object_in_hot_size = counter(3);
        statistics.object_in_cool_count = counter(4);
        statistics.total_object_in_cool_size = counter(5);
        statistics.object_in_cold_count = counter(6);
        statistics.total_object_in_cold_size = counter(7);
        statistics.object_in_archive_count = counter(8);
        statistics.total_object_in_archive_size = counter(9);
        statistics.metadata_list = serde_json::from_str(metadata.value(row))?;

        records.push(StoredStatistics {
            record_id: record_ids.value(row).to_string(),
            partition_key: partitions.value(row).to_string(),
            recorded_at: columns.to_datetime(recorded.value(row))?,
            statistics,
        });
    }
    Ok(records)
}

/// Typed column access with errors naming the offending file.
struct BatchColumns<'a> {
    path: &'a Path,
    batch: &'a RecordBatch,
}

impl<'a> BatchColumns<'a> {
    fn column(&self, name: &str) -> Result<&'a ArrayRef, StoreError> {
        let column = self
            .batch
            .column_by_name(name)
            .ok_or_else(|| self.schema_error(format!("missing column {name}")))?;
        if column.null_count() > 0 {
            return Err(self.schema_error(format!("null values in column {name}")));
        }
        Ok(column)
    }

    fn strings(&self, name: &str) -> Result<&'a StringArray, StoreError> {
        self.column(name)?
            .as_string_opt::<i32>()
            .ok_or_else(|| self.schema_error(format!("column {name} is not utf8")))
    }

    fn counters(&self, name: &str) -> Result<&'a UInt64Array, StoreError> {
        self.column(name)?
            .as_primitive_opt::<UInt64Type>()
            .ok_or_else(|| self.schema_error(format!("column {name} is not uint64")))
    }

    fn timestamps(&self, name: &str) -> Result<&'a TimestampMicrosecondArray, StoreError> {
        self.column(name)?
            .as_primitive_opt::<TimestampMicrosecondType>()
            .ok_or_else(|| self.schema_error(format!("column {name} is not a timestamp")))
    }

    fn to_datetime(&self, micros: i64) -> Result<DateTime<Utc>, StoreError> {
        DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| self.schema_error(format!("timestamp {micros} out of range")))
    }

    fn schema_error(&self, message: String) -> StoreError {
        StoreError::Schema {
            path: self.path.to_path_buf(),
            message,
        }
    }
}
