//! On-disk index format.
//!
//! Layout: 4-byte magic `DQIX`, little-endian `u32` format version, then a
//! bincode payload `{ dimension, metric, embedder_id, entries }`. Vectors are
//! written exactly as held in memory so a loaded index ranks identically.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use docqa_core::error::{Error, Result};
use docqa_core::types::Metric;

use crate::index::{check_stored_vector, IndexEntry, VectorIndex};

pub const MAGIC: [u8; 4] = *b"DQIX";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct PayloadRef<'a> {
    dimension: usize,
    metric: Metric,
    embedder_id: &'a str,
    entries: &'a [IndexEntry],
}

#[derive(Deserialize)]
struct Payload {
    dimension: usize,
    metric: Metric,
    embedder_id: String,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        let payload = PayloadRef {
            dimension: self.dimension,
            metric: self.metric,
            embedder_id: &self.embedder_id,
            entries: &self.entries,
        };
        bincode::serialize_into(&mut writer, &payload).map_err(|e| Error::Storage(e.to_string()))?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut header = [0u8; 8];
        reader
            .read_exact(&mut header)
            .map_err(|_| Error::CorruptIndex("file too short for header".into()))?;
        if header[..4] != MAGIC {
            return Err(Error::CorruptIndex("bad magic, not an index file".into()));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != FORMAT_VERSION {
            return Err(Error::CorruptIndex(format!("unsupported format version {version}, expected {FORMAT_VERSION}")));
        }
        let payload: Payload = bincode::deserialize_from(reader).map_err(|e| Error::CorruptIndex(e.to_string()))?;
        if payload.entries.is_empty() {
            return Err(Error::CorruptIndex("index has no entries".into()));
        }
        if payload.dimension == 0 {
            return Err(Error::CorruptIndex("index declares zero dimensions".into()));
        }
        for entry in &payload.entries {
            if entry.vector.len() != payload.dimension {
                return Err(Error::CorruptIndex(format!(
                    "entry {} has {} components, header declares {}",
                    entry.chunk.id(),
                    entry.vector.len(),
                    payload.dimension
                )));
            }
            check_stored_vector(&entry.vector, payload.metric)
                .map_err(|reason| Error::CorruptIndex(format!("entry {} {reason}", entry.chunk.id())))?;
        }
        Ok(Self {
            dimension: payload.dimension,
            metric: payload.metric,
            embedder_id: payload.embedder_id,
            entries: payload.entries,
        })
    }

    /// Writes the index to `path` through a temp file in the same directory
    /// and renames it into place, so readers never observe a partial file and
    /// a failed save leaves any previous index intact.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_to(BufWriter::new(tmp.as_file_mut()))?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        info!(path = %path.display(), entries = self.len(), "saved vector index");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Storage(format!("cannot open index {}: {e}", path.display())))?;
        let index = Self::read_from(BufReader::new(file))?;
        info!(path = %path.display(), entries = index.len(), dimension = index.dimension, "loaded vector index");
        Ok(index)
    }
}
