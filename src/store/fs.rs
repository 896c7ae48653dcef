//! File-per-token authoritative store.
//!
//! Each record lives in `<data_dir>/<token>.json`, self-contained, so the
//! store shards trivially by token. Writes go through a temp file, are
//! fsynced and then renamed into place: a create is durable before it
//! returns and a record file is never partially visible.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::token;

use super::{build_record, create_with_fresh_token, StoreError, TipPage, TipPageInput, TipPageStore};

pub struct FsStore {
    data_dir: PathBuf,
}

impl FsStore {
    /// Open the store, creating the data directory if needed.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn record_path(&self, token: &str) -> PathBuf {
        self.data_dir.join(format!("{token}.json"))
    }

    fn write_record(&self, token: &str, record: &TipPage) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let tmp = self.data_dir.join(format!("{token}.json.tmp"));
        let mut file = fs::File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, self.record_path(token))?;
        Ok(())
    }
}

impl TipPageStore for FsStore {
    fn create(&self, input: TipPageInput) -> Result<String, StoreError> {
        let record = build_record(input)?;
        let token = create_with_fresh_token(&record, |token, record| {
            if self.record_path(token).exists() {
                return Ok(false);
            }
            self.write_record(token, record)?;
            Ok(true)
        })?;
        tracing::debug!("[STORE] tip page record written");
        Ok(token)
    }

    fn get(&self, token: &str) -> Result<TipPage, StoreError> {
        // Malformed tokens never touch the filesystem; this also keeps
        // traversal strings out of the path join.
        if !token::is_well_formed(token) {
            return Err(StoreError::NotFound);
        }
        let bytes = match fs::read(self.record_path(token)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}
