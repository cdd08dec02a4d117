//! HTTP transport and response envelope decoding
//!
//! Every WeChat endpoint answers HTTP 200 and signals failure inside the
//! JSON body as `{"errcode": N, "errmsg": "..."}`. An absent or zero
//! `errcode` means success and the same body carries the payload.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::constants::DEFAULT_API_BASE;
use crate::error::{Error, Result};

/// Thin wrapper over `reqwest::Client` bound to an API base URL.
///
/// Cheap to clone. Timeouts and proxies are configured on the inner client
/// by the caller.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_API_BASE)
    }

    /// Client pointed at a non-default host (mock servers, regional gateways).
    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body to `path` with the given query parameters.
    pub async fn post_json<B, T>(&self, path: &str, query: &[(&str, &str)], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, query)?;
        debug!(path, "POST");
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(format!("POST {path} failed: {e}")))?;
        decode(path, response).await
    }

    /// GET `path` with the given query parameters.
    pub async fn get_json<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path, query)?;
        debug!(path, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(format!("GET {path} failed: {e}")))?;
        decode(path, response).await
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| Error::Http(format!("invalid URL for {path}: {e}")))?;
        // An empty pair list would still leave a dangling `?`
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(path: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::Http(format!("{path} returned {status}: {body}")));
    }

    let value = response
        .json::<Value>()
        .await
        .map_err(|e| Error::InvalidResponse(format!("{path} body is not JSON: {e}")))?;
    decode_envelope(value)
}

/// Split a response body into the payload or an `Api` error.
pub(crate) fn decode_envelope<T: DeserializeOwned>(value: Value) -> Result<T> {
    let errcode = value
        .get("errcode")
        .and_then(Value::as_i64)
        .unwrap_or_default();
    if errcode != 0 {
        let errmsg = value
            .get("errmsg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        return Err(Error::Api { errcode, errmsg });
    }

    serde_json::from_value(value).map_err(|e| Error::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_mock;
    use axum::Json;
    use axum::routing::{get, post};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Payload {
        pre_auth_code: String,
    }

    #[test]
    fn envelope_with_errcode_is_api_error() {
        let err =
            decode_envelope::<Payload>(json!({"errcode": 40001, "errmsg": "invalid credential"}))
                .unwrap_err();
        assert!(err.is_stale_credential());
        assert_eq!(err.to_string(), "API error (40001): invalid credential");
    }

    #[test]
    fn envelope_with_zero_errcode_is_success() {
        decode_envelope::<serde::de::IgnoredAny>(json!({"errcode": 0, "errmsg": "ok"})).unwrap();

        let payload: Payload =
            decode_envelope(json!({"pre_auth_code": "pac", "expires_in": 600})).unwrap();
        assert_eq!(payload.pre_auth_code, "pac");
    }

    #[test]
    fn envelope_missing_fields_is_invalid_response() {
        let err = decode_envelope::<Payload>(json!({"something": "else"})).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)), "got: {err:?}");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = ApiClient::with_base_url(reqwest::Client::new(), "http://127.0.0.1:1/");
        assert_eq!(api.base_url(), "http://127.0.0.1:1");
        let url = api.url("/a/b", &[("k", "v w")]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:1/a/b?k=v+w");
        let bare = api.url("/a/b", &[]).unwrap();
        assert_eq!(bare.as_str(), "http://127.0.0.1:1/a/b");
    }

    #[tokio::test]
    async fn post_json_sends_body_and_query() {
        let app = axum::Router::new().route(
            "/echo",
            post(
                |axum::extract::RawQuery(query): axum::extract::RawQuery,
                 Json(body): Json<Value>| async move {
                    Json(json!({"query": query, "body": body}))
                },
            ),
        );
        let (base, _handle) = spawn_mock(app).await;
        let api = ApiClient::with_base_url(reqwest::Client::new(), base);

        let echoed: Value = api
            .post_json("/echo", &[("component_access_token", "tok")], &json!({"a": 1}))
            .await
            .unwrap();
        assert_eq!(echoed["query"], "component_access_token=tok");
        assert_eq!(echoed["body"]["a"], 1);
    }

    #[tokio::test]
    async fn post_without_query_sends_bare_path() {
        let app = axum::Router::new().route(
            "/issue",
            post(
                |uri: axum::http::Uri, Json(_body): Json<Value>| async move {
                    Json(json!({"uri": uri.to_string()}))
                },
            ),
        );
        let (base, _handle) = spawn_mock(app).await;
        let api = ApiClient::with_base_url(reqwest::Client::new(), base);

        let echoed: Value = api.post_json("/issue", &[], &json!({})).await.unwrap();
        assert_eq!(echoed["uri"], "/issue");
    }

    #[tokio::test]
    async fn non_success_status_is_http_error() {
        let app = axum::Router::new().route(
            "/broken",
            get(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let (base, _handle) = spawn_mock(app).await;
        let api = ApiClient::with_base_url(reqwest::Client::new(), base);

        let err = api.get_json::<Value>("/broken", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
        assert!(err.to_string().contains("502"), "got: {err}");
    }

    #[tokio::test]
    async fn unreachable_host_is_http_error() {
        // Port 9 (discard) on localhost is not listening in test environments
        let api = ApiClient::with_base_url(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = api.get_json::<Value>("/x", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got: {err:?}");
    }
}
