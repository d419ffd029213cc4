//! Environment-variable layering. Kept in its own test binary because it
//! mutates the process environment.

use std::fs;
use tempfile::TempDir;

use docqa_core::config::Config;
use docqa_core::{Error, Metric};

#[test]
fn app_env_vars_override_files_with_nested_keys() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("docqa.toml"), "[chunking]\nmax_chunk_size = 400\noverlap = 40\n").unwrap();

    std::env::set_var("APP_CHUNKING__OVERLAP", "50");
    std::env::set_var("APP_RETRIEVAL__METRIC", "dot");
    let settings = Config::load_from(tmp.path(), "dev").unwrap().settings().unwrap();
    assert_eq!(settings.chunking.max_chunk_size, 400, "file value survives");
    assert_eq!(settings.chunking.overlap, 50, "env wins over file");
    assert_eq!(settings.retrieval.metric, Metric::Dot);

    std::env::set_var("APP_CHUNKING__OVERLAP", "400");
    let err = Config::load_from(tmp.path(), "dev").unwrap().settings().unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    std::env::remove_var("APP_CHUNKING__OVERLAP");
    std::env::remove_var("APP_RETRIEVAL__METRIC");
}
