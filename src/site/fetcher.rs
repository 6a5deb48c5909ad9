//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester:
//! - Building the shared client with user agent and session cookies
//! - GET requests for listing and post pages
//! - GET requests for asset bytes together with their declared length

use crate::config::SiteConfig;
use crate::{ConfigError, HarvestError};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, COOKIE};
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;

/// Asset bytes as received, plus the length the server declared
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    /// URL the asset was requested from
    pub url: String,
    /// Body bytes
    pub bytes: Vec<u8>,
    /// `Content-Length` header value
    pub declared_length: u64,
}

impl FetchedAsset {
    /// Number of bytes actually received
    pub fn actual_length(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Builds an HTTP client with proper configuration
///
/// Every request carries the configured user agent and the configured
/// cookies joined into one `Cookie` header. Page bodies are transparently
/// decompressed.
///
/// # Example
///
/// ```no_run
/// use booru_harvester::config::SiteConfig;
/// use booru_harvester::site::build_http_client;
///
/// let client = build_http_client(&SiteConfig::default(), 60).unwrap();
/// ```
pub fn build_http_client(config: &SiteConfig, timeout_secs: u64) -> Result<Client, HarvestError> {
    let client = client_builder(config, timeout_secs)?
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Builds the client used for asset downloads
///
/// Decompression stays off: reqwest drops `Content-Length` from responses
/// it decodes, and the length check needs the declared value to compare
/// against the bytes received.
pub fn build_asset_client(config: &SiteConfig, timeout_secs: u64) -> Result<Client, HarvestError> {
    let client = client_builder(config, timeout_secs)?
        .gzip(false)
        .brotli(false)
        .build()?;

    Ok(client)
}

fn client_builder(config: &SiteConfig, timeout_secs: u64) -> Result<ClientBuilder, HarvestError> {
    let mut headers = HeaderMap::new();
    if !config.cookies.is_empty() {
        let cookie = config.cookies.join("; ");
        let value = HeaderValue::from_str(&cookie).map_err(|e| {
            ConfigError::Validation(format!("cookies are not a valid header value: {}", e))
        })?;
        headers.insert(COOKIE, value);
    }

    Ok(Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10)))
}

/// Sends a GET request and rejects non-success statuses
async fn get(client: &Client, url: &str) -> Result<Response, HarvestError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}

/// Fetches an HTML page and returns its body
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, HarvestError> {
    let response = get(client, url).await?;
    response.text().await.map_err(|source| HarvestError::Http {
        url: url.to_string(),
        source,
    })
}

/// Fetches asset bytes and the declared `Content-Length`
///
/// The declared length is read from the response headers before the body
/// is consumed; a response without one is rejected.
pub async fn fetch_asset(client: &Client, url: &str) -> Result<FetchedAsset, HarvestError> {
    let response = get(client, url).await?;

    let declared_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| HarvestError::MissingContentLength {
            url: url.to_string(),
        })?;

    let bytes = response.bytes().await.map_err(|source| HarvestError::Http {
        url: url.to_string(),
        source,
    })?;

    Ok(FetchedAsset {
        url: url.to_string(),
        bytes: bytes.to_vec(),
        declared_length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> SiteConfig {
        SiteConfig {
            base_url: "https://booru.example.com".to_string(),
            query: "all".to_string(),
            cookies: vec!["fringeBenefits=yup".to_string(), "theme=dark".to_string()],
            user_agent: "TestHarvester/1.0".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&create_test_config(), 30);
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_cookie_rejected() {
        let mut config = create_test_config();
        config.cookies = vec!["bad=\nvalue".to_string()];
        assert!(matches!(
            build_http_client(&config, 30),
            Err(HarvestError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_page_sends_cookies() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("cookie", "fringeBenefits=yup; theme=dark"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = build_http_client(&create_test_config(), 30).unwrap();
        let body = fetch_page(&client, &format!("{}/page", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html></html>");
    }

    #[tokio::test]
    async fn test_fetch_page_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = build_http_client(&create_test_config(), 30).unwrap();
        let err = fetch_page(&client, &format!("{}/page", mock_server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::Status { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_asset_reads_declared_length() {
        let mock_server = MockServer::start().await;
        let body = vec![7u8; 1234];
        Mock::given(method("GET"))
            .and(path("/images/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&mock_server)
            .await;

        let client = build_http_client(&create_test_config(), 30).unwrap();
        let asset = fetch_asset(&client, &format!("{}/images/1.png", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(asset.declared_length, 1234);
        assert_eq!(asset.actual_length(), 1234);
        assert_eq!(asset.bytes, body);
    }

    // gzip stream of an empty payload
    const GZIP_EMPTY: [u8; 20] = [
        0x1f, 0x8b, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x03, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[tokio::test]
    async fn test_encoded_asset_keeps_declared_length() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/images/2.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "gzip")
                    .set_body_bytes(GZIP_EMPTY.to_vec()),
            )
            .mount(&mock_server)
            .await;

        let client = build_asset_client(&create_test_config(), 30).unwrap();
        let asset = fetch_asset(&client, &format!("{}/images/2.png", mock_server.uri()))
            .await
            .unwrap();

        assert_eq!(asset.declared_length, 20);
        assert_eq!(asset.bytes, GZIP_EMPTY.to_vec());
    }

    #[tokio::test]
    async fn test_asset_client_does_not_request_compression() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("accept-encoding"))
            .respond_with(ResponseTemplate::new(500))
            .with_priority(1)
            .expect(0)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8; 16]))
            .mount(&mock_server)
            .await;

        let client = build_asset_client(&create_test_config(), 30).unwrap();
        let asset = fetch_asset(&client, &format!("{}/images/3.png", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(asset.declared_length, 16);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = build_http_client(&create_test_config(), 5).unwrap();
        let err = fetch_page(&client, &format!("http://{}/", addr))
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::Http { .. }));
        assert!(err.is_transient());
    }
}
