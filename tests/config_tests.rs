use std::path::Path;
use std::time::Duration;

use arbfill::adapter::outbound::catalog::FileCatalog;
use arbfill::domain::{ArbitrageListing, ListingId, SourcePlatform};
use arbfill::infrastructure::config::settings::Config;
use arbfill::port::outbound::catalog::ListingCatalog;
use rust_decimal_macros::dec;

fn repo_file(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(name)
}

#[test]
fn example_config_matches_defaults() {
    let example = Config::load(repo_file("config.example.toml")).unwrap();
    let defaults = Config::default();

    assert_eq!(example.database, defaults.database);
    assert_eq!(example.queue.path, defaults.queue.path);
    assert_eq!(
        example.fees.schedule().platform_rate(SourcePlatform::Fiverr),
        dec!(0.05)
    );
    assert_eq!(
        example.fees.schedule().platform_rate(SourcePlatform::Upwork),
        defaults.fees.schedule().platform_rate(SourcePlatform::Upwork)
    );
    assert_eq!(
        example.source.timeout_for(SourcePlatform::HuggingFace),
        Duration::from_secs(60)
    );
    assert_eq!(example.sla.threshold_hours, 72);
    assert_eq!(example.router().enqueue_attempts, 3);
    assert!(example.alerts.webhook_url.is_none());
}

#[tokio::test]
async fn example_catalog_loads_and_validates() {
    let catalog = FileCatalog::load(repo_file("listings.example.toml")).unwrap();
    assert_eq!(catalog.len(), 3);

    for id in ["img-gen", "bg-remove", "logo"] {
        let record = catalog.get(&ListingId::new(id)).await.unwrap().unwrap();
        ArbitrageListing::try_from(record).unwrap();
    }
}

#[test]
fn invalid_webhook_url_is_rejected() {
    let err = Config::parse_toml("[alerts]\nwebhook_url = \"not a url\"\n").unwrap_err();
    assert!(err.to_string().contains("alerts.webhook_url"));
}
