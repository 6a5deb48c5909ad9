//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the image board and run
//! complete harvests into temporary directories.

use booru_harvester::config::{Config, CrawlerConfig, OutputConfig, SiteConfig, ValidationConfig};
use booru_harvester::harvest::{DriverExit, Harvester};
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock board
fn create_test_config(base_url: &str, output: &Path) -> Config {
    Config {
        site: SiteConfig {
            base_url: base_url.to_string(),
            query: "sort:score".to_string(),
            cookies: vec!["fringeBenefits=yup".to_string()],
            user_agent: "TestHarvester/1.0".to_string(),
        },
        crawler: CrawlerConfig {
            workers: 4,
            admission_poll_ms: 5,
            page_retry_delay_ms: 20,
            requeue_delay_ms: 20,
            request_timeout_secs: 5,
            ..CrawlerConfig::default()
        },
        output: OutputConfig {
            directory: output.to_string_lossy().into_owned(),
            tag_file: "tags.psv".to_string(),
        },
        validation: ValidationConfig::default(),
    }
}

fn listing_html(ids: &[u32]) -> String {
    let anchors: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<a id="p{id}" href="/index.php?page=post&amp;s=view&amp;id={id}"><img src="/thumbs/{id}.jpg"></a>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><div class="thumbnail-container">{}</div></body></html>"#,
        anchors
    )
}

fn post_html(base_url: &str, id: u32, rating: &str, tags: &str) -> String {
    format!(
        r#"<html><body>
        <section class="image-container" data-rating="{rating}" data-tags="{tags}"></section>
        <ul><li><a href="{base_url}/images/{id}.png" rel="noopener">Original image</a></li></ul>
        </body></html>"#
    )
}

fn png_bytes() -> Vec<u8> {
    let image = image::RgbImage::from_pixel(4, 3, image::Rgb([200, 40, 40]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

async fn mount_listing(server: &MockServer, offset: u32, ids: &[u32]) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("s", "list"))
        .and(query_param("pid", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_html(ids)))
        .mount(server)
        .await;
}

async fn mount_post(server: &MockServer, id: u32, tags: &str) {
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("s", "view"))
        .and(query_param("id", id.to_string()))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(post_html(&server.uri(), id, "general", tags)),
        )
        .mount(server)
        .await;
}

async fn mount_assets(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/images/\d+\.png$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .mount(server)
        .await;
}

fn saved_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read output directory")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_full_harvest_skips_existing_and_terminates() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("3.jpg"), b"already here").unwrap();

    mount_listing(&server, 0, &[1, 2, 3]).await;
    mount_listing(&server, 3, &[]).await;
    mount_post(&server, 1, "sky").await;
    mount_post(&server, 2, "sea").await;
    mount_assets(&server).await;

    let config = create_test_config(&server.uri(), dir.path());
    let mut harvester = Harvester::new(&config).expect("Failed to build harvester");
    let report = harvester.run().await;

    assert_eq!(report.exit, DriverExit::Exhausted);
    assert_eq!(report.stats.seen, 3);
    assert_eq!(report.stats.skipped_existing, 1);
    assert_eq!(report.stats.submitted, 2);
    assert_eq!(report.stats.saved, 2);
    assert_eq!(harvester.admission().in_flight(), 0);

    assert_eq!(saved_files(dir.path()), vec!["1.png", "2.png", "3.jpg"]);
    assert_eq!(
        std::fs::read(dir.path().join("1.png")).unwrap(),
        png_bytes()
    );
    // Untouched pre-existing file
    assert_eq!(
        std::fs::read(dir.path().join("3.jpg")).unwrap(),
        b"already here"
    );
}

#[tokio::test]
async fn test_rerun_downloads_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 0, &[10, 11]).await;
    mount_listing(&server, 2, &[]).await;
    mount_post(&server, 10, "a").await;
    mount_post(&server, 11, "b").await;
    mount_assets(&server).await;

    let config = create_test_config(&server.uri(), dir.path());
    let first = booru_harvester::run_harvest(&config).await.unwrap();
    assert_eq!(first.stats.saved, 2);

    // Second run against a board that must not serve any post or asset
    server.reset().await;
    mount_listing(&server, 0, &[10, 11]).await;
    mount_listing(&server, 2, &[]).await;
    Mock::given(method("GET"))
        .and(query_param("s", "view"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/images/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let second = booru_harvester::run_harvest(&config).await.unwrap();
    assert_eq!(second.exit, DriverExit::Exhausted);
    assert_eq!(second.stats.skipped_existing, 2);
    assert_eq!(second.stats.submitted, 0);
    assert_eq!(saved_files(dir.path()), vec!["10.png", "11.png"]);
}

#[tokio::test]
async fn test_tag_ledger_has_one_record_per_saved_item() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 0, &[21, 22]).await;
    mount_listing(&server, 2, &[]).await;
    mount_post(&server, 21, "blue_sky cloud").await;
    mount_post(&server, 22, "ocean").await;
    mount_assets(&server).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.validation.save_tags = true;
    booru_harvester::run_harvest(&config).await.unwrap();

    let ledger = std::fs::read_to_string(dir.path().join("tags.psv")).unwrap();
    let mut lines: Vec<&str> = ledger.lines().collect();
    lines.sort();
    assert_eq!(
        lines,
        vec!["21|general, blue_sky, cloud", "22|general, ocean"]
    );
}

#[tokio::test]
async fn test_item_cap_stops_discovery() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 0, &[31, 32, 33, 34, 35]).await;
    for id in 31..=35 {
        mount_post(&server, id, "t").await;
    }
    mount_assets(&server).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.crawler.item_cap = Some(2);

    let report = booru_harvester::run_harvest(&config).await.unwrap();

    assert_eq!(report.exit, DriverExit::CapReached);
    assert_eq!(report.stats.seen, 2);
    assert_eq!(report.stats.saved, 2);
    assert_eq!(saved_files(dir.path()), vec!["31.png", "32.png"]);
}

#[tokio::test]
async fn test_corrupt_image_is_requeued_until_valid() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 0, &[41]).await;
    mount_listing(&server, 1, &[]).await;
    mount_post(&server, 41, "t").await;

    // First download is garbage of the declared length
    Mock::given(method("GET"))
        .and(path("/images/41.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"definitely not a png".to_vec()))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_assets(&server).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.validation.validate_images = true;

    let report = booru_harvester::run_harvest(&config).await.unwrap();

    assert_eq!(report.stats.requeued, 1);
    assert_eq!(report.stats.saved, 1);
    assert_eq!(
        std::fs::read(dir.path().join("41.png")).unwrap(),
        png_bytes()
    );
}

#[tokio::test]
async fn test_failed_listing_page_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("s", "list"))
        .and(query_param("pid", "0"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_listing(&server, 0, &[51]).await;
    mount_listing(&server, 1, &[]).await;
    mount_post(&server, 51, "t").await;
    mount_assets(&server).await;

    let config = create_test_config(&server.uri(), dir.path());
    let report = booru_harvester::run_harvest(&config).await.unwrap();

    assert_eq!(report.exit, DriverExit::Exhausted);
    assert_eq!(report.stats.seen, 1);
    assert_eq!(saved_files(dir.path()), vec!["51.png"]);
}

#[tokio::test]
async fn test_creates_missing_output_directory() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("nested").join("out");

    mount_listing(&server, 0, &[]).await;

    let config = create_test_config(&server.uri(), &output);
    let report = booru_harvester::run_harvest(&config).await.unwrap();

    assert_eq!(report.exit, DriverExit::Exhausted);
    assert!(output.is_dir());
}

#[tokio::test]
async fn test_link_without_id_refetches_whole_page() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // The first two fetches carry a link with no id; nothing from them is queued
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("s", "list"))
        .and(query_param("pid", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="thumbnail-container">
                <a href="/index.php?page=post&amp;s=view&amp;id=61">a</a>
                <a href="/index.php?page=post&amp;s=view">b</a>
            </div>"#,
        ))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_listing(&server, 0, &[61, 62]).await;
    mount_listing(&server, 2, &[]).await;
    mount_post(&server, 61, "t").await;
    mount_post(&server, 62, "t").await;
    mount_assets(&server).await;

    let config = create_test_config(&server.uri(), dir.path());
    let report = booru_harvester::run_harvest(&config).await.unwrap();

    assert_eq!(report.exit, DriverExit::Exhausted);
    assert_eq!(report.stats.seen, 2);
    assert_eq!(report.stats.submitted, 2);
    assert_eq!(report.stats.saved, 2);
    assert_eq!(saved_files(dir.path()), vec!["61.png", "62.png"]);
}

#[tokio::test]
async fn test_existing_items_count_toward_cap() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("71.jpg"), b"old").unwrap();
    std::fs::write(dir.path().join("72.jpg"), b"old").unwrap();

    mount_listing(&server, 0, &[71, 72, 73, 74]).await;
    for id in 73..=74 {
        mount_post(&server, id, "t").await;
    }
    mount_assets(&server).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.crawler.item_cap = Some(3);

    let report = booru_harvester::run_harvest(&config).await.unwrap();

    assert_eq!(report.exit, DriverExit::CapReached);
    assert_eq!(report.stats.seen, 3);
    assert_eq!(report.stats.skipped_existing, 2);
    assert_eq!(report.stats.saved, 1);
    assert_eq!(saved_files(dir.path()), vec!["71.jpg", "72.jpg", "73.png"]);
}

#[tokio::test]
async fn test_requeued_item_records_tags_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, 0, &[81]).await;
    mount_listing(&server, 1, &[]).await;
    mount_post(&server, 81, "moon").await;
    Mock::given(method("GET"))
        .and(path("/images/81.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"broken".to_vec()))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_assets(&server).await;

    let mut config = create_test_config(&server.uri(), dir.path());
    config.validation.save_tags = true;
    config.validation.validate_images = true;

    let report = booru_harvester::run_harvest(&config).await.unwrap();
    assert_eq!(report.stats.requeued, 2);
    assert_eq!(report.stats.saved, 1);

    let ledger = std::fs::read_to_string(dir.path().join("tags.psv")).unwrap();
    assert_eq!(ledger, "81|general, moon\n");
}
