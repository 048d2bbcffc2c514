use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CreditError, Result};
use crate::fields::mask;

/// Header naming the vendor integration the caller is registered as
pub const INTERFACE_HEADER: &str = "MCL-Interface";

static SENSITIVE_REGEX: OnceLock<Regex> = OnceLock::new();

fn sensitive_regex() -> &'static Regex {
    SENSITIVE_REGEX.get_or_init(|| {
        Regex::new(
            r"<((?:\w+:)?(?:TaxpayerIdentifierValue|ServicePaymentAccountIdentifier|ServicePaymentSecondaryCreditAccountIdentifier))>([^<]*)</",
        )
        .expect("Failed to compile sensitive field regex")
    })
}

/// Copy of `document` with SSNs and card data masked, for logging
pub fn redact(document: &str) -> String {
    sensitive_regex()
        .replace_all(document, |caps: &regex::Captures<'_>| {
            format!("<{}>{}</", &caps[1], mask(&caps[2]))
        })
        .into_owned()
}

/// Anything that can deliver a request document and hand back the response document
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn submit(&self, document: &str) -> Result<String>;
}

/// Endpoint and account the client posts to
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub url: String,
    pub login: String,
    pub password: String,
    pub interface_identifier: Option<String>,
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds (for exponential backoff cap)
    pub max_retry_delay_ms: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            user_agent: format!("smartapi-credit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Async HTTP transport posting request documents to the SmartAPI endpoint
pub struct SmartApiClient {
    client: Client,
    credentials: ApiCredentials,
    config: HttpClientConfig,
}

impl SmartApiClient {
    pub fn new(credentials: ApiCredentials, config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(CreditError::from)?;

        Ok(Self {
            client,
            credentials,
            config,
        })
    }

    /// Post with retry logic and exponential backoff
    async fn post_with_retry(&self, document: &str, request_id: &Uuid) -> Result<Response> {
        let url = self.credentials.url.as_str();
        let mut current_attempt = 0;

        loop {
            match self.make_request(document).await {
                Ok(response) => {
                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let status = response.status();
                    let error = CreditError::HttpStatus {
                        url: url.to_string(),
                        status: status.as_u16(),
                        message: format!(
                            "HTTP {}: {}",
                            status.as_u16(),
                            status.canonical_reason().unwrap_or("Unknown")
                        ),
                    };

                    // Retry on server errors (5xx) but not client errors (4xx)
                    if status.is_server_error() && current_attempt < self.config.retry_attempts {
                        warn!(%request_id, attempt = current_attempt + 1, %error, "Retrying request");
                        self.wait_before_retry(current_attempt).await;
                        current_attempt += 1;
                        continue;
                    }

                    return Err(error);
                }
                Err(error) => {
                    if current_attempt < self.config.retry_attempts && self.is_retryable_error(&error)
                    {
                        warn!(%request_id, attempt = current_attempt + 1, %error, "Retrying request");
                        self.wait_before_retry(current_attempt).await;
                        current_attempt += 1;
                        continue;
                    }
                    return Err(error);
                }
            }
        }
    }

    /// Make a single HTTP request with timeout
    async fn make_request(&self, document: &str) -> Result<Response> {
        let mut request = self
            .client
            .post(&self.credentials.url)
            .basic_auth(&self.credentials.login, Some(&self.credentials.password))
            .header(CONTENT_TYPE, "application/xml")
            .body(document.to_string());
        if let Some(interface) = &self.credentials.interface_identifier {
            request = request.header(INTERFACE_HEADER, interface);
        }

        timeout(
            Duration::from_secs(self.config.timeout_seconds),
            request.send(),
        )
        .await
        .map_err(|_| CreditError::Timeout {
            url: self.credentials.url.clone(),
            timeout_seconds: self.config.timeout_seconds,
        })?
        .map_err(CreditError::from)
    }

    /// Wait before retry with exponential backoff
    async fn wait_before_retry(&self, attempt: u32) {
        sleep(self.retry_delay(attempt)).await;
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .config
            .retry_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.config.max_retry_delay_ms))
    }

    /// Check if an error is retryable
    fn is_retryable_error(&self, error: &CreditError) -> bool {
        match error {
            CreditError::Http(reqwest_error) => {
                reqwest_error.is_timeout() || reqwest_error.is_connect() || reqwest_error.is_request()
            }
            CreditError::Timeout { .. } => true,
            _ => false,
        }
    }

    pub fn credentials(&self) -> &ApiCredentials {
        &self.credentials
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for SmartApiClient {
    async fn submit(&self, document: &str) -> Result<String> {
        let request_id = Uuid::new_v4();
        info!(%request_id, url = %self.credentials.url, "Submitting request document");
        debug!(%request_id, body = %redact(document), "Request body");

        let response = self.post_with_retry(document, &request_id).await?;
        let body = response.text().await.map_err(CreditError::from)?;

        debug!(%request_id, body = %redact(&body), "Response body");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials(url: String) -> ApiCredentials {
        ApiCredentials {
            url,
            login: "user".to_string(),
            password: "secret".to_string(),
            interface_identifier: Some("SmartAPITestingIdentifier".to_string()),
        }
    }

    fn fast_config() -> HttpClientConfig {
        HttpClientConfig {
            timeout_seconds: 5,
            retry_attempts: 2,
            retry_delay_ms: 10,
            max_retry_delay_ms: 20,
            ..Default::default()
        }
    }

    #[test]
    fn test_redact_masks_sensitive_values() {
        let xml = "<TaxpayerIdentifierValue>123456789</TaxpayerIdentifierValue>\
                   <P3:ServicePaymentAccountIdentifier>4111111111111111</P3:ServicePaymentAccountIdentifier>\
                   <FirstName>Ann</FirstName>";
        let redacted = redact(xml);
        assert!(redacted.contains("<TaxpayerIdentifierValue>*****6789</TaxpayerIdentifierValue>"));
        assert!(redacted.contains("************1111"));
        assert!(redacted.contains("<FirstName>Ann</FirstName>"));
    }

    #[test]
    fn test_backoff_is_capped() {
        let client = SmartApiClient::new(
            credentials("http://localhost".to_string()),
            HttpClientConfig {
                retry_delay_ms: 1000,
                max_retry_delay_ms: 3000,
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(client.retry_delay(0), Duration::from_millis(1000));
        assert_eq!(client.retry_delay(1), Duration::from_millis(2000));
        assert_eq!(client.retry_delay(2), Duration::from_millis(3000));
        assert_eq!(client.retry_delay(40), Duration::from_millis(3000));
    }

    #[test]
    fn test_retryable_error_detection() {
        let client =
            SmartApiClient::new(credentials("http://localhost".to_string()), fast_config()).unwrap();

        let timeout_error = CreditError::Timeout {
            url: "http://example.com".to_string(),
            timeout_seconds: 30,
        };
        assert!(client.is_retryable_error(&timeout_error));
        assert!(!client.is_retryable_error(&CreditError::EmptyResponse));
    }

    #[tokio::test]
    async fn test_submit_posts_with_auth_and_interface_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/inetapi/request_products.aspx"))
            .and(header_exists("authorization"))
            .and(header(INTERFACE_HEADER, "SmartAPITestingIdentifier"))
            .and(header("content-type", "application/xml"))
            .and(body_string_contains("<MESSAGE"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<MESSAGE/>"))
            .expect(1)
            .mount(&server)
            .await;

        let client = SmartApiClient::new(
            credentials(format!("{}/inetapi/request_products.aspx", server.uri())),
            fast_config(),
        )
        .unwrap();

        let body = client.submit("<MESSAGE MessageType=\"Request\"/>").await.unwrap();
        assert_eq!(body, "<MESSAGE/>");
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = SmartApiClient::new(credentials(server.uri()), fast_config()).unwrap();
        let err = client.submit("<MESSAGE/>").await.unwrap_err();
        assert!(matches!(err, CreditError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = SmartApiClient::new(credentials(server.uri()), fast_config()).unwrap();
        let err = client.submit("<MESSAGE/>").await.unwrap_err();
        assert!(matches!(err, CreditError::HttpStatus { status: 401, .. }));
    }
}
