use std::fs;
use std::path::Path;
use tempfile::TempDir;

use docqa_core::config::{resolve_with_base, Config};
use docqa_core::source::{load_documents, DirectorySource, JsonRecordsSource};
use docqa_core::{Chunker, Document, DocumentSource, Error, Metric};

#[test]
fn directory_source_single_small_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "Short text\n").unwrap();

    let docs = load_documents(&DirectorySource::new(dir)).expect("load");
    let chunks = Chunker::new(100, 10).unwrap().chunk(&docs);

    assert_eq!(chunks.len(), 1, "one small file becomes one chunk");
    assert_eq!(chunks[0].text, "Short text\n");
    assert_eq!(chunks[0].doc_id, "a.txt");
}

#[test]
fn directory_source_ids_are_sorted_relative_paths() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("sub")).unwrap();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("sub/a.md"), "alpha").unwrap();
    fs::write(dir.join("skip.bin"), "binary").unwrap();

    let ids: Vec<String> = DirectorySource::new(dir).load().unwrap().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["b.txt".to_string(), "sub/a.md".to_string()]);
}

#[test]
fn directory_source_limit_one() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("a.txt"), "alpha bravo").unwrap();
    fs::write(dir.join("b.txt"), "charlie delta").unwrap();

    let docs = DirectorySource::new(dir).with_limit(1).load().expect("load limited");
    assert_eq!(docs.len(), 1, "limited to one source document");
}

#[test]
fn missing_directory_is_a_config_error() {
    let err = DirectorySource::new("/definitely/not/here").load().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn json_records_become_documents() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("records.json");
    fs::write(
        &path,
        r#"[{"id":"invoice_0","file_name":"a.png","data":{"company":"Acme","total":"10"}},
            {"id":"invoice_1","data":{"vendor":"Globex"}}]"#,
    )
    .unwrap();

    let docs = load_documents(&JsonRecordsSource::new(&path).with_title_label("Invoice")).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].text, "Invoice: a.png\n\nCompany: Acme\nTotal Amount: 10");
    assert_eq!(docs[1].text, "Invoice: invoice_1\n\nVendor: Globex");
}

struct Fixed(Vec<Document>);
impl DocumentSource for Fixed {
    fn load(&self) -> docqa_core::Result<Vec<Document>> { Ok(self.0.clone()) }
}

#[test]
fn duplicate_ids_are_rejected() {
    let source = Fixed(vec![Document::new("x", "one"), Document::new("x", "two")]);
    assert!(matches!(load_documents(&source), Err(Error::InvalidArgument(_))));
}

#[test]
fn settings_defaults_are_valid() {
    let settings = Config::from_figment(figment::Figment::new()).settings().unwrap();
    assert_eq!(settings.chunking.max_chunk_size, 1000);
    assert_eq!(settings.chunking.overlap, 200);
    assert_eq!(settings.retrieval.metric, Metric::Cosine);
    assert_eq!(settings.retrieval.top_k, 5);
    assert_eq!(settings.generation.max_context_chars, 8000);
}

#[test]
fn settings_file_overrides_and_validation() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("docqa.toml"),
        "[chunking]\nmax_chunk_size = 300\noverlap = 30\n[retrieval]\nmetric = \"dot\"\ntop_k = 3\n",
    )
    .unwrap();
    fs::write(tmp.path().join("docqa.test.toml"), "[retrieval]\ntop_k = 7\n").unwrap();

    let settings = Config::load_from(tmp.path(), "test").unwrap().settings().unwrap();
    assert_eq!(settings.chunking.max_chunk_size, 300);
    assert_eq!(settings.retrieval.metric, Metric::Dot);
    assert_eq!(settings.retrieval.top_k, 7, "environment file wins over base file");

    fs::write(tmp.path().join("docqa.toml"), "[chunking]\nmax_chunk_size = 50\noverlap = 50\n").unwrap();
    let err = Config::load_from(tmp.path(), "prod").unwrap().settings().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn resolve_relative_paths_against_base() {
    let base = Path::new("/srv/docqa");
    assert_eq!(resolve_with_base(base, "data/index.dqix"), base.join("data/index.dqix"));
    assert_eq!(resolve_with_base(base, "/abs/index.dqix"), Path::new("/abs/index.dqix"));
}
