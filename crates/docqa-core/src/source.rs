//! Document sources: plain-text directories and JSON record dumps.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::traits::DocumentSource;
use crate::types::Document;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md"];

/// Every `.txt`/`.md` file under `root`, in sorted path order. The document id
/// is the path relative to `root`, which stays stable across runs.
pub struct DirectorySource {
    root: PathBuf,
    limit: Option<usize>,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into(), limit: None } }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn list_text_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext)))
            .collect();
        files.sort();
        files
    }

    fn doc_id(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
    }
}

fn read_file_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            warn!(path = %path.display(), "file is not valid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
        }
        Err(e) => Err(e.into()),
    }
}

impl DocumentSource for DirectorySource {
    fn load(&self) -> Result<Vec<Document>> {
        if !self.root.is_dir() {
            return Err(Error::Config(format!("data directory {} does not exist", self.root.display())));
        }
        let mut files = self.list_text_files();
        if let Some(limit) = self.limit {
            files.truncate(limit);
        }
        let documents = files
            .iter()
            .map(|path| Ok(Document::new(self.doc_id(path), read_file_content(path)?)))
            .collect::<Result<Vec<_>>>()?;
        info!(root = %self.root.display(), documents = documents.len(), "loaded directory source");
        Ok(documents)
    }
}

#[derive(Debug, Deserialize)]
struct Record {
    id: String,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    data: Map<String, Value>,
}

/// Field keys rendered first, in this order, with their display labels.
const KNOWN_FIELDS: &[(&str, &str)] = &[
    ("company", "Company"),
    ("vendor", "Vendor"),
    ("invoice_number", "Invoice Number"),
    ("invoice_date", "Date"),
    ("due_date", "Due Date"),
    ("total", "Total Amount"),
    ("subtotal", "Subtotal"),
    ("tax", "Tax"),
    ("address", "Address"),
    ("items", "Line Items"),
];

/// A JSON array of structured records, each rendered into searchable text.
pub struct JsonRecordsSource {
    path: PathBuf,
    title_label: String,
}

impl JsonRecordsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), title_label: "Record".to_string() }
    }

    pub fn with_title_label(mut self, label: impl Into<String>) -> Self {
        self.title_label = label.into();
        self
    }

    fn render(&self, record: &Record) -> String {
        let title = record.file_name.as_deref().unwrap_or(&record.id);
        let mut lines = Vec::new();
        for (key, label) in KNOWN_FIELDS {
            if let Some(value) = record.data.get(*key).and_then(render_value) {
                lines.push(format!("{label}: {value}"));
            }
        }
        let mut rest: Vec<(&String, &Value)> =
            record.data.iter().filter(|(key, _)| !KNOWN_FIELDS.iter().any(|(k, _)| *k == key.as_str())).collect();
        rest.sort_by(|a, b| a.0.cmp(b.0));
        for (key, value) in rest {
            if let Some(value) = render_value(value) {
                lines.push(format!("{key}: {value}"));
            }
        }
        format!("{}: {}\n\n{}", self.title_label, title, lines.join("\n"))
    }
}

/// Renders one field value, or `None` when the value is empty.
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.to_string()),
    }
}

impl DocumentSource for JsonRecordsSource {
    fn load(&self) -> Result<Vec<Document>> {
        let raw = fs::read_to_string(&self.path)?;
        let records: Vec<Record> = serde_json::from_str(&raw)
            .map_err(|e| Error::InvalidArgument(format!("{} is not a JSON record array: {e}", self.path.display())))?;
        let documents: Vec<Document> = records.iter().map(|r| Document::new(r.id.clone(), self.render(r))).collect();
        info!(path = %self.path.display(), documents = documents.len(), "loaded JSON record source");
        Ok(documents)
    }
}

/// Loads a source and rejects duplicate document ids.
pub fn load_documents(source: &dyn DocumentSource) -> Result<Vec<Document>> {
    let documents = source.load()?;
    let mut seen = HashSet::new();
    for doc in &documents {
        if !seen.insert(doc.id.as_str()) {
            return Err(Error::InvalidArgument(format!("duplicate document id '{}'", doc.id)));
        }
    }
    Ok(documents)
}
