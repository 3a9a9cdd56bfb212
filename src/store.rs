//! Dataset Store: loads the CSV snapshot once and hands out copies of the
//! frame and the typed records. The snapshot is immutable after load.

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::record::{records_from_frame, AnimeRecord};
use polars::prelude::*;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, OnceLock};

static SHARED: OnceLock<std::result::Result<DatasetStore, String>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct DatasetStore {
    frame: DataFrame,
    records: Vec<AnimeRecord>,
}

impl DatasetStore {
    /// Read the snapshot CSV eagerly. Any failure to locate or parse the
    /// file is reported as `DataUnavailable` naming the path.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::DataUnavailable(format!(
                "dataset not found: {}",
                path.display()
            )));
        }
        let pl_path = PlPath::Local(Arc::from(path));
        let frame = LazyCsvReader::new(pl_path)
            .with_has_header(true)
            .finish()
            .and_then(|lf| lf.collect())
            .map_err(|e| {
                Error::DataUnavailable(format!("failed to read {}: {}", path.display(), e))
            })?;
        let records = records_from_frame(&frame)?;
        Ok(Self { frame, records })
    }

    /// Process-wide store, loaded at most once. Concurrent first callers
    /// race on `OnceLock`, so exactly one load happens; later callers with a
    /// different path still get the first snapshot.
    pub fn shared(config: &AppConfig) -> Result<&'static DatasetStore> {
        let loaded = SHARED.get_or_init(|| Self::open(&config.data_path).map_err(|e| e.to_string()));
        match loaded {
            Ok(store) => Ok(store),
            Err(msg) => Err(Error::DataUnavailable(msg.clone())),
        }
    }

    /// Copy of the raw frame (browse path).
    pub fn frame(&self) -> DataFrame {
        self.frame.clone()
    }

    /// Copy of the typed records (analytics path).
    pub fn records(&self) -> Vec<AnimeRecord> {
        self.records.clone()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

/// Write a frame back out as CSV, schema-identical to the input plus any
/// normalization already applied to it.
pub fn export_csv<W: Write>(df: &DataFrame, writer: W) -> Result<()> {
    let mut df = df.clone();
    CsvWriter::new(writer).include_header(true).finish(&mut df)?;
    Ok(())
}
