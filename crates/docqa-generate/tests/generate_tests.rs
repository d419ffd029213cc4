use std::time::Duration;

use docqa_core::config::GenerationSettings;
use docqa_core::traits::Generator;
use docqa_generate::GeminiGenerator;

#[test]
fn config_key_wins_over_env() {
    let settings = GenerationSettings { api_key: Some("from-config".into()), model: "gemini-x".into(), ..Default::default() };
    let g = GeminiGenerator::from_config_or_env(&settings).unwrap();
    assert_eq!(g.model(), "gemini-x");
    assert_eq!(g.name(), "gemini");
}

#[tokio::test]
async fn unreachable_host_fails_without_panicking() {
    // Port 9 (discard) on localhost is closed in test environments.
    let g = GeminiGenerator::new("key".into(), "m")
        .unwrap()
        .with_base_url("http://127.0.0.1:9")
        .with_timeout(Duration::from_secs(2));
    let err = g.generate("hello").await.unwrap_err();
    assert!(err.to_string().contains("Gemini request failed"));
}
