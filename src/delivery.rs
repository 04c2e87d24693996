//! Webhook delivery of a finished batch.
//!
//! The receiving workflow endpoint has accepted its token in different places
//! over time, so delivery walks a small fallback matrix of token placements
//! and stops at the first 2xx response:
//!
//! | # | URL | Header |
//! |---|-----|--------|
//! | 1 | `endpoint?token=…` | token header |
//! | 2 | `endpoint?token=…` | none |
//! | 3 | `endpoint` | token header |
//! | 4 | `endpoint` | none |
//!
//! Without a configured token only row 4 exists. Basic credentials, when
//! configured, go with every row. A fixed backoff separates attempts.
//!
//! Exhausting the matrix is reported as [`DeliveryOutcome::Failed`], or as
//! [`ScrapeError::DeliveryFailed`] in strict mode.

use crate::error::ScrapeError;
use crate::models::BatchPayload;
use crate::utils::truncate_for_log;
use reqwest::header::CONTENT_TYPE;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Query parameter carrying the token.
pub const TOKEN_PARAM: &str = "token";

pub const DEFAULT_TOKEN_HEADER: &str = "X-Webhook-Token";

/// HTTP basic credentials attached to every attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and how to deliver batches.
#[derive(Clone)]
pub struct DeliveryConfig {
    pub endpoint: String,
    /// Shared secret; `None` disables the token variants.
    pub token: Option<String>,
    pub token_header: String,
    pub basic_auth: Option<BasicAuth>,
    /// Exhausting the matrix is an error instead of a logged outcome.
    pub strict: bool,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl DeliveryConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token: None,
            token_header: DEFAULT_TOKEN_HEADER.to_string(),
            basic_auth: None,
            strict: false,
            backoff: Duration::from_millis(1000),
        }
    }
}

impl fmt::Debug for DeliveryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_header", &self.token_header)
            .field("basic_auth", &self.basic_auth)
            .field("strict", &self.strict)
            .field("backoff", &self.backoff)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlVariant {
    TokenQuery,
    Bare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVariant {
    TokenHeader,
    NoHeader,
}

/// Ordered (URL, header) combinations to try.
pub fn fallback_matrix(has_token: bool) -> Vec<(UrlVariant, HeaderVariant)> {
    let urls: &[UrlVariant] = if has_token {
        &[UrlVariant::TokenQuery, UrlVariant::Bare]
    } else {
        &[UrlVariant::Bare]
    };
    let headers: &[HeaderVariant] = if has_token {
        &[HeaderVariant::TokenHeader, HeaderVariant::NoHeader]
    } else {
        &[HeaderVariant::NoHeader]
    };
    urls.iter()
        .flat_map(|&url| headers.iter().map(move |&header| (url, header)))
        .collect()
}

/// Append the percent-encoded token as a query parameter.
pub fn url_with_token(endpoint: &str, token: &str) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{endpoint}{separator}{TOKEN_PARAM}={}",
        urlencoding::encode(token)
    )
}

/// A fully resolved POST for one matrix row.
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub url: String,
    /// Header name and value.
    pub header: Option<(String, String)>,
    pub basic_auth: Option<BasicAuth>,
    /// JSON body.
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one webhook POST.
///
/// `Err` is a transport failure (connection, timeout); any HTTP response,
/// whatever its status, is `Ok`.
pub trait WebhookTransport {
    async fn post(&self, request: &OutgoingRequest) -> Result<TransportResponse, String>;
}

/// [`WebhookTransport`] over a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl WebhookTransport for HttpTransport {
    async fn post(&self, request: &OutgoingRequest) -> Result<TransportResponse, String> {
        let mut builder = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json")
            .body(request.body.clone());
        if let Some((name, value)) = &request.header {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(auth) = &request.basic_auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(TransportResponse { status, body })
    }
}

/// The record of one matrix row.
#[derive(Debug, Clone)]
pub struct DeliveryAttempt {
    pub url_variant: UrlVariant,
    pub header_variant: HeaderVariant,
    /// Status of a 2xx response, or why the row failed.
    pub outcome: Result<u16, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: usize, status: u16 },
    Failed { attempts: usize, last_error: String },
}

/// Posts batch payloads through the fallback matrix.
pub struct DeliveryClient<T> {
    config: DeliveryConfig,
    transport: T,
}

impl<T: WebhookTransport> DeliveryClient<T> {
    pub fn new(config: DeliveryConfig, transport: T) -> Self {
        Self { config, transport }
    }

    /// Deliver `payload`, trying each matrix row until one gets a 2xx.
    ///
    /// # Returns
    ///
    /// [`DeliveryOutcome::Delivered`] on the first 2xx, otherwise
    /// [`DeliveryOutcome::Failed`] when not in strict mode.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::DeliveryFailed`] when every row failed in strict mode
    /// - [`ScrapeError::Payload`] when the payload cannot be serialized
    #[instrument(level = "info", skip_all, fields(articles = payload.articles.len()))]
    pub async fn deliver(
        &self,
        payload: &BatchPayload<'_>,
    ) -> Result<DeliveryOutcome, ScrapeError> {
        let body = serde_json::to_string(payload)?;
        let matrix = fallback_matrix(self.config.token.is_some());
        let max = matrix.len();
        let t0 = Instant::now();
        let mut last_error = String::new();

        for (index, (url_variant, header_variant)) in matrix.into_iter().enumerate() {
            if index > 0 {
                sleep(self.config.backoff).await;
            }
            let attempt = self.attempt(url_variant, header_variant, &body).await;

            match attempt.outcome {
                Ok(status) => {
                    info!(
                        attempt = index + 1,
                        status,
                        url_variant = ?attempt.url_variant,
                        header_variant = ?attempt.header_variant,
                        elapsed_ms_total = t0.elapsed().as_millis() as u64,
                        "Batch delivered"
                    );
                    return Ok(DeliveryOutcome::Delivered {
                        attempts: index + 1,
                        status,
                    });
                }
                Err(e) => {
                    warn!(
                        attempt = index + 1,
                        max,
                        url_variant = ?attempt.url_variant,
                        header_variant = ?attempt.header_variant,
                        error = %e,
                        "Delivery attempt failed"
                    );
                    last_error = e;
                }
            }
        }

        error!(
            attempts = max,
            strict = self.config.strict,
            elapsed_ms_total = t0.elapsed().as_millis() as u64,
            error = %last_error,
            "Delivery exhausted every URL/header combination"
        );
        if self.config.strict {
            return Err(ScrapeError::DeliveryFailed {
                attempts: max,
                last: last_error,
            });
        }
        Ok(DeliveryOutcome::Failed {
            attempts: max,
            last_error,
        })
    }

    async fn attempt(
        &self,
        url_variant: UrlVariant,
        header_variant: HeaderVariant,
        body: &str,
    ) -> DeliveryAttempt {
        let request = self.request(url_variant, header_variant, body);
        let outcome = match self.transport.post(&request).await {
            Ok(response) if (200..300).contains(&response.status) => Ok(response.status),
            Ok(response) => Err(format!(
                "HTTP {}: {}",
                response.status,
                truncate_for_log(&response.body, 500)
            )),
            Err(e) => Err(e),
        };
        DeliveryAttempt {
            url_variant,
            header_variant,
            outcome,
        }
    }

    fn request(
        &self,
        url_variant: UrlVariant,
        header_variant: HeaderVariant,
        body: &str,
    ) -> OutgoingRequest {
        let token = self.config.token.as_deref();
        let url = match (url_variant, token) {
            (UrlVariant::TokenQuery, Some(token)) => url_with_token(&self.config.endpoint, token),
            _ => self.config.endpoint.clone(),
        };
        let header = match (header_variant, token) {
            (HeaderVariant::TokenHeader, Some(token)) => {
                Some((self.config.token_header.clone(), token.to_string()))
            }
            _ => None,
        };
        OutgoingRequest {
            url,
            header,
            basic_auth: self.config.basic_auth.clone(),
            body: body.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleRequest, ExtractionResult};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Answers with a fixed sequence of statuses (or transport errors).
    #[derive(Default)]
    struct ScriptedTransport {
        replies: RefCell<VecDeque<Result<u16, String>>>,
        requests: RefCell<Vec<OutgoingRequest>>,
    }

    impl ScriptedTransport {
        fn replying(replies: Vec<Result<u16, String>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                requests: RefCell::default(),
            }
        }
    }

    impl WebhookTransport for &ScriptedTransport {
        async fn post(&self, request: &OutgoingRequest) -> Result<TransportResponse, String> {
            self.requests.borrow_mut().push(request.clone());
            let reply = self.replies.borrow_mut().pop_front().unwrap_or(Ok(500))?;
            Ok(TransportResponse {
                status: reply,
                body: format!("status {reply}"),
            })
        }
    }

    const ENDPOINT: &str = "https://n8n.example.com/webhook-waiting/123";

    fn config(token: Option<&str>) -> DeliveryConfig {
        DeliveryConfig {
            token: token.map(str::to_string),
            backoff: Duration::ZERO,
            ..DeliveryConfig::new(ENDPOINT)
        }
    }

    fn results() -> Vec<ExtractionResult> {
        let request = ArticleRequest {
            url: "https://www.vz.lt/a".to_string(),
            title: "A".to_string(),
            publication_date: "2025-05-06".to_string(),
        };
        vec![ExtractionResult::new(&request, "Tekstas".to_string(), "AI")]
    }

    #[test]
    fn test_matrix_order_with_token() {
        assert_eq!(
            fallback_matrix(true),
            vec![
                (UrlVariant::TokenQuery, HeaderVariant::TokenHeader),
                (UrlVariant::TokenQuery, HeaderVariant::NoHeader),
                (UrlVariant::Bare, HeaderVariant::TokenHeader),
                (UrlVariant::Bare, HeaderVariant::NoHeader),
            ]
        );
        assert_eq!(
            fallback_matrix(false),
            vec![(UrlVariant::Bare, HeaderVariant::NoHeader)]
        );
    }

    #[test]
    fn test_token_query_is_encoded_and_joined() {
        assert_eq!(
            url_with_token("https://h/w", "a b&c"),
            "https://h/w?token=a%20b%26c"
        );
        assert_eq!(
            url_with_token("https://h/w?x=1", "t"),
            "https://h/w?x=1&token=t"
        );
    }

    #[tokio::test]
    async fn test_third_combination_succeeds_after_three_attempts() {
        let transport = ScriptedTransport::replying(vec![Ok(401), Ok(403), Ok(200)]);
        let client = DeliveryClient::new(config(Some("s3cret")), &transport);
        let results = results();
        let payload = BatchPayload {
            articles: &results,
            trending_topics: "AI",
        };

        let outcome = client.deliver(&payload).await.unwrap();

        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 3, status: 200 });
        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 3);
        let token_url = format!("{ENDPOINT}?token=s3cret");
        assert_eq!(requests[0].url, token_url);
        assert_eq!(
            requests[0].header,
            Some(("X-Webhook-Token".to_string(), "s3cret".to_string()))
        );
        assert_eq!(requests[1].url, token_url);
        assert_eq!(requests[1].header, None);
        assert_eq!(requests[2].url, ENDPOINT);
        assert!(requests[2].header.is_some());

        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(body["trending_topics"], "AI");
        assert_eq!(body["articles"][0]["url"], "https://www.vz.lt/a");
    }

    #[tokio::test]
    async fn test_strict_mode_exhaustion_is_an_error() {
        let transport = ScriptedTransport::replying(vec![Ok(500), Ok(500), Ok(500), Ok(502)]);
        let client = DeliveryClient::new(
            DeliveryConfig {
                strict: true,
                ..config(Some("t"))
            },
            &transport,
        );
        let payload = BatchPayload {
            articles: &[],
            trending_topics: "",
        };

        let err = client.deliver(&payload).await.unwrap_err();

        assert!(matches!(
            err,
            ScrapeError::DeliveryFailed { attempts: 4, ref last } if last.starts_with("HTTP 502")
        ));
        assert_eq!(transport.requests.borrow().len(), 4);
    }

    #[tokio::test]
    async fn test_lenient_mode_exhaustion_is_reported() {
        let transport = ScriptedTransport::replying(vec![
            Err("connection refused".to_string()),
            Ok(404),
            Ok(404),
            Err("operation timed out".to_string()),
        ]);
        let client = DeliveryClient::new(config(Some("t")), &transport);
        let payload = BatchPayload {
            articles: &[],
            trending_topics: "",
        };

        let outcome = client.deliver(&payload).await.unwrap();

        assert_eq!(
            outcome,
            DeliveryOutcome::Failed {
                attempts: 4,
                last_error: "operation timed out".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_without_token_only_the_bare_endpoint_is_tried() {
        let transport = ScriptedTransport::replying(vec![Ok(500)]);
        let client = DeliveryClient::new(config(None), &transport);
        let payload = BatchPayload {
            articles: &[],
            trending_topics: "",
        };

        let outcome = client.deliver(&payload).await.unwrap();

        assert!(matches!(outcome, DeliveryOutcome::Failed { attempts: 1, .. }));
        let requests = transport.requests.borrow();
        assert_eq!(requests[0].url, ENDPOINT);
        assert_eq!(requests[0].header, None);
        assert_eq!(requests[0].body, r#"{"articles":[],"trending_topics":""}"#);
    }

    #[tokio::test]
    async fn test_basic_auth_goes_with_every_attempt() {
        let transport = ScriptedTransport::replying(vec![Ok(401), Ok(401), Ok(401), Ok(204)]);
        let client = DeliveryClient::new(
            DeliveryConfig {
                basic_auth: Some(BasicAuth {
                    username: "n8n".to_string(),
                    password: "pw".to_string(),
                }),
                token_header: "X-Custom".to_string(),
                ..config(Some("t"))
            },
            &transport,
        );
        let results = results();
        let payload = BatchPayload {
            articles: &results,
            trending_topics: "",
        };

        let outcome = client.deliver(&payload).await.unwrap();

        assert_eq!(outcome, DeliveryOutcome::Delivered { attempts: 4, status: 204 });
        let requests = transport.requests.borrow();
        assert!(
            requests
                .iter()
                .all(|r| r.basic_auth.as_ref().is_some_and(|a| a.username == "n8n"))
        );
        assert_eq!(requests[0].header.as_ref().unwrap().0, "X-Custom");
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        let config = DeliveryConfig {
            basic_auth: Some(BasicAuth {
                username: "n8n".to_string(),
                password: "pw-secret".to_string(),
            }),
            ..config(Some("tok-secret"))
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("pw-secret"));
        assert!(!debug.contains("tok-secret"));
    }
}
