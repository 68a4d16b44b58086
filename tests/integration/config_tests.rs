//! Loading the shipped example configuration

use job_trawl::config::{load_config, load_config_with_hash};
use job_trawl::crawler::{plan, TrawlOptions};
use std::path::{Path, PathBuf};

fn example_config() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.toml")
}

#[test]
fn test_example_config_is_valid() {
    let (config, hash) = load_config_with_hash(&example_config()).unwrap();

    assert_eq!(hash.len(), 64);
    assert!(!config.proxy.enabled);
    assert_eq!(config.output.combined_file.as_deref(), Some("all_jobs.json"));

    let planned = plan(&config, &TrawlOptions::default());
    let caps: Vec<_> = planned
        .iter()
        .map(|p| (p.name.as_str(), p.max_pages))
        .collect();
    assert_eq!(caps, vec![("yuanjisong", 5), ("sxsapi", 3)]);
}

#[test]
fn test_cli_overrides_narrow_the_plan() {
    let config = load_config(&example_config()).unwrap();
    let options = TrawlOptions {
        platforms: vec!["yuanjisong".to_string()],
        max_pages: Some(0),
        no_proxy: true,
    };

    let planned = plan(&config, &options);
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].name, "yuanjisong");
    assert_eq!(planned[0].max_pages, 0);
}
