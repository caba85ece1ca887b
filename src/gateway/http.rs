use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{Gateway, GatewayFuture};
use crate::domain::{
    ApiEnvelope, ApiFilterOption, CollectionsPage, ProductPage, ProductQuery, SUCCESS_STATUS,
    SaveConstantsRequest,
};
use crate::error::GatewayError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// reqwest-backed gateway talking to the commerce backend's `Collection`
/// endpoints with the session's bearer token.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut base_url = Url::parse(config.base_url.trim()).map_err(|err| GatewayError::InvalidRequest {
            message: format!("Invalid API URL `{}`: {err}", config.base_url),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidRequest {
                message: format!("API URL `{}` cannot be used as a base", config.base_url),
            });
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10));
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }
        let client = builder.build().map_err(|err| GatewayError::InvalidRequest {
            message: format!("Failed to build HTTP client: {err}"),
        })?;

        Ok(Self {
            client,
            base_url,
            access_token: config
                .access_token
                .as_deref()
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| GatewayError::InvalidRequest {
                message: format!("API URL `{}` cannot be used as a base", self.base_url),
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Sends one request and returns the body of a 2xx response. Anything
    /// else becomes a rejection carrying the server's explanation.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
        call: &str,
    ) -> Result<String, GatewayError> {
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|err| {
            warn!(%method, %url, error = %err, "backend request failed");
            GatewayError::Transport {
                message: err.to_string(),
            }
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|err| GatewayError::Transport {
            message: format!("Failed to read response: {err}"),
        })?;
        debug!(
            %method,
            %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend responded"
        );

        if !status.is_success() {
            return Err(GatewayError::Rejected {
                message: rejection_message(status, &text, call),
            });
        }
        Ok(text)
    }
}

impl Gateway for HttpGateway {
    fn list_collections(&self, page: u32, page_size: u32) -> GatewayFuture<'_, CollectionsPage> {
        Box::pin(async move {
            let mut url = self.endpoint(&["Collection", "GetAll"])?;
            url.query_pairs_mut()
                .append_pair("page", &page.to_string())
                .append_pair("pageSize", &page_size.to_string());
            let body = self.send(Method::GET, url, None, "fetch collections").await?;
            decode_collections(&body)
        })
    }

    fn filter_options(&self, collection_id: &str) -> GatewayFuture<'_, Vec<ApiFilterOption>> {
        let collection_id = collection_id.to_string();
        Box::pin(async move {
            let url = self.endpoint(&["Collection", collection_id.as_str(), "GetFiltersForConstants"])?;
            let body = self.send(Method::GET, url, None, "fetch filter options").await?;
            decode_envelope(&body, "Invalid data structure for filter options")
        })
    }

    fn available_products(
        &self,
        collection_id: &str,
        query: ProductQuery,
    ) -> GatewayFuture<'_, ProductPage> {
        let collection_id = collection_id.to_string();
        Box::pin(async move {
            let url = self.endpoint(&["Collection", collection_id.as_str(), "GetProductsForConstants"])?;
            let payload = to_json(&query)?;
            let body = self.send(Method::POST, url, Some(payload), "fetch products").await?;
            decode_envelope(&body, "Invalid data structure for products")
        })
    }

    fn save_pinned_products(
        &self,
        collection_id: &str,
        request: SaveConstantsRequest,
    ) -> GatewayFuture<'_, ()> {
        let collection_id = collection_id.to_string();
        Box::pin(async move {
            let url = self.endpoint(&["Collection", collection_id.as_str(), "SaveConstants"])?;
            let payload = to_json(&request)?;
            let body = self.send(Method::POST, url, Some(payload), "save constants").await?;
            check_save_body(&body)
        })
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, GatewayError> {
    serde_json::to_value(value).map_err(|err| GatewayError::InvalidRequest {
        message: format!("Failed to encode request body: {err}"),
    })
}

fn decode_envelope<T: DeserializeOwned>(body: &str, fallback: &str) -> Result<T, GatewayError> {
    let envelope: ApiEnvelope<T> = serde_json::from_str(body).map_err(|err| GatewayError::Decode {
        message: err.to_string(),
    })?;
    envelope.into_result(fallback)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CollectionsResponse {
    Envelope(ApiEnvelope<CollectionsPage>),
    Bare(CollectionsPage),
}

/// The listing comes either wrapped in the usual envelope or as a bare
/// `{meta, data}` object.
fn decode_collections(body: &str) -> Result<CollectionsPage, GatewayError> {
    let response: CollectionsResponse = serde_json::from_str(body).map_err(|err| GatewayError::Decode {
        message: err.to_string(),
    })?;
    match response {
        CollectionsResponse::Envelope(envelope) => envelope.into_result("Invalid data structure for collections"),
        CollectionsResponse::Bare(page) => Ok(page),
    }
}

/// The save endpoint's body is not otherwise interpreted, but an envelope
/// that reports a failure status still counts as a rejection.
fn check_save_body(body: &str) -> Result<(), GatewayError> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Ok(());
    };
    let Some(status) = value.get("status").and_then(serde_json::Value::as_i64) else {
        return Ok(());
    };
    if status == SUCCESS_STATUS {
        return Ok(());
    }
    let message = value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Failed to save constants: status {status}"));
    Err(GatewayError::Rejected { message })
}

/// Picks the most useful explanation out of an error response body.
fn rejection_message(status: StatusCode, body: &str, call: &str) -> String {
    let from_body = serde_json::from_str::<serde_json::Value>(body).ok().and_then(|value| {
        ["error", "message"].iter().find_map(|field| {
            value
                .get(*field)
                .and_then(serde_json::Value::as_str)
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string)
        })
    });
    match from_body {
        Some(message) => message,
        None => format!(
            "Failed to {call}: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(&GatewayConfig::new(base)).unwrap()
    }

    #[test]
    fn endpoint_joins_segments_under_base_path() {
        let gateway = gateway("https://api.example.com/v1");
        let url = gateway
            .endpoint(&["Collection", "42", "GetFiltersForConstants"])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/Collection/42/GetFiltersForConstants");
    }

    #[test]
    fn endpoint_escapes_collection_ids() {
        let gateway = gateway("https://api.example.com/");
        let url = gateway.endpoint(&["Collection", "a/b c", "SaveConstants"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/Collection/a%2Fb%20c/SaveConstants");
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = HttpGateway::new(&GatewayConfig::new("not a url")).err().unwrap();
        assert!(matches!(err, GatewayError::InvalidRequest { .. }));
    }

    #[test]
    fn rejection_prefers_error_field_then_status() {
        assert_eq!(
            rejection_message(StatusCode::UNAUTHORIZED, r#"{"error": "Unauthorized"}"#, "fetch products"),
            "Unauthorized"
        );
        assert_eq!(
            rejection_message(StatusCode::BAD_GATEWAY, "<html>", "fetch products"),
            "Failed to fetch products: 502 Bad Gateway"
        );
    }

    #[test]
    fn decode_envelope_reports_malformed_json() {
        let err = decode_envelope::<ProductPage>("{not json", "fallback").unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
        assert!(err.to_string().starts_with("Failed to parse response"));
    }

    #[test]
    fn collections_accept_envelope_and_bare_shapes() {
        let page = r#"{
            "meta": {"page": 1, "pageSize": 10, "totalCount": 1, "totalPages": 1, "hasPreviousPage": false, "hasNextPage": false},
            "data": [{"id": 7, "type": 0, "info": {"name": "Summer", "description": "", "url": "summer", "langCode": "TR"}, "salesChannelId": 1}]
        }"#;
        let bare = decode_collections(page).unwrap();
        assert_eq!(bare.data[0].info.name, "Summer");

        let wrapped = format!(r#"{{"status": 200, "message": null, "data": {page}}}"#);
        let wrapped = decode_collections(&wrapped).unwrap();
        assert_eq!(wrapped.data[0].id, 7);
    }

    #[test]
    fn save_body_with_failure_status_is_rejected() {
        assert!(check_save_body("").is_ok());
        assert!(check_save_body(r#"{"status": 200, "message": null}"#).is_ok());

        let err = check_save_body(r#"{"status": 500, "message": "Constant limit exceeded"}"#).unwrap_err();
        assert_eq!(err.to_string(), "Constant limit exceeded");
    }
}
