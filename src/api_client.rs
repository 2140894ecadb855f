use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use crate::error::{H2hError, Result};
use crate::source::StatSource;
use crate::types::{ComparableEntity, EntityKind, EntityRef, StatQuery, StatRecord};

pub const DEFAULT_TOKEN_ENV: &str = "H2H_API_TOKEN";

/// Credentials attached to API requests. Token lifecycle is owned by the
/// caller; the client only attaches what it is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ApiAuth {
    #[default]
    None,
    Bearer(String),
}

impl ApiAuth {
    /// Read a bearer token from `var`, ignoring blank values.
    pub fn from_env(var: &str) -> Self {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => ApiAuth::Bearer(token.trim().to_string()),
            _ => ApiAuth::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClientOptions {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ApiClientOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(10),
            user_agent: format!("h2h/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client for the stats API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    auth: ApiAuth,
}

impl ApiClient {
    pub fn new(options: ApiClientOptions, auth: ApiAuth) -> Result<Self> {
        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent)
            .build()?;
        Ok(Self {
            http,
            base_url: options.base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn stats_url(&self, entity: EntityRef, query: StatQuery) -> Result<Url> {
        let id = entity.id;
        match (entity.kind, query) {
            (EntityKind::Driver, StatQuery::Career) => {
                build_api_url(&self.base_url, &format!("api/drivers/{id}/career-stats"), &[])
            }
            (EntityKind::Driver, StatQuery::Season(year)) => build_api_url(
                &self.base_url,
                &format!("api/drivers/{id}/career-stats"),
                &[("year", year.to_string())],
            ),
            (EntityKind::Constructor, StatQuery::Career) => {
                build_api_url(&self.base_url, &format!("api/constructors/{id}/stats"), &[])
            }
            (EntityKind::Constructor, StatQuery::Season(year)) => build_api_url(
                &self.base_url,
                &format!("api/constructors/{id}/stats"),
                &[("years", year.to_string())],
            ),
        }
    }

    pub fn profile_url(&self, entity: EntityRef) -> Result<Url> {
        build_api_url(
            &self.base_url,
            &format!("api/{}/{}", entity.kind.path_segment(), entity.id),
            &[],
        )
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        log::debug!("GET {url}");
        let mut request = self.http.get(url);
        if let ApiAuth::Bearer(token) = &self.auth {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(H2hError::api(Some(status), api_error_message(status, &body)));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl StatSource for ApiClient {
    fn fetch_stats(&self, entity: EntityRef, query: StatQuery) -> BoxFuture<'_, Result<StatRecord>> {
        async move {
            let url = self.stats_url(entity, query)?;
            let payload = self.get_json(url).await?;
            Ok(StatRecord::from_payload(&payload))
        }
        .boxed()
    }

    fn fetch_entity(&self, entity: EntityRef) -> BoxFuture<'_, Result<ComparableEntity>> {
        async move {
            let url = self.profile_url(entity)?;
            let payload = self.get_json(url).await?;
            Ok(ComparableEntity::from_payload(entity, &payload))
        }
        .boxed()
    }
}

/// Join `path` onto `base`, keeping any path prefix the base already has
/// (`http://host/backend` + `api/x` -> `http://host/backend/api/x`).
pub fn build_api_url(base: &Url, path: &str, query: &[(&str, String)]) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    let mut url = base.join(path.trim_start_matches('/'))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

fn api_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    fn driver(id: u32) -> EntityRef {
        EntityRef::new(EntityKind::Driver, EntityId::new(id).unwrap())
    }

    fn client(base: &str, auth: ApiAuth) -> ApiClient {
        ApiClient::new(ApiClientOptions::new(Url::parse(base).unwrap()), auth).unwrap()
    }

    /// Serve exactly one canned HTTP response and hand back the raw request head.
    async fn serve_once(status_line: &str, body: &str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&head).to_string());
        });
        (format!("http://{addr}"), rx)
    }

    #[test]
    fn build_api_url_keeps_base_prefix_and_encodes_query() {
        let base = Url::parse("http://stats.local/backend").unwrap();
        let url = build_api_url(&base, "/api/drivers/1/career-stats", &[("year", "2021".into())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://stats.local/backend/api/drivers/1/career-stats?year=2021"
        );
    }

    #[test]
    fn endpoints_follow_entity_kind() {
        let client = client("http://localhost:3000", ApiAuth::None);
        let ctor = EntityRef::new(EntityKind::Constructor, EntityId::new(9).unwrap());
        assert_eq!(
            client.stats_url(driver(1), StatQuery::Career).unwrap().as_str(),
            "http://localhost:3000/api/drivers/1/career-stats"
        );
        assert_eq!(
            client.stats_url(ctor, StatQuery::Season(2023)).unwrap().as_str(),
            "http://localhost:3000/api/constructors/9/stats?years=2023"
        );
        assert_eq!(
            client.profile_url(ctor).unwrap().as_str(),
            "http://localhost:3000/api/constructors/9"
        );
    }

    #[test]
    fn error_message_prefers_body_fields() {
        assert_eq!(
            api_error_message(StatusCode::NOT_FOUND, r#"{"error":"Driver not found"}"#),
            "Driver not found"
        );
        assert_eq!(
            api_error_message(StatusCode::BAD_GATEWAY, "<html>"),
            "Bad Gateway"
        );
    }

    #[tokio::test]
    async fn fetch_stats_sends_bearer_token_and_decodes_payload() {
        let (base, request) = serve_once("200 OK", r#"{"wins":"4","podiums":9,"dnfs":null}"#).await;
        let client = client(&base, ApiAuth::Bearer("secret-token".into()));

        let record = client
            .fetch_stats(driver(1), StatQuery::Season(2021))
            .await
            .unwrap();
        assert_eq!(record.wins, 4.0);
        assert_eq!(record.podiums, 9.0);
        assert_eq!(record.dnfs, 0.0);

        let head = request.await.unwrap().to_ascii_lowercase();
        assert!(head.starts_with("get /api/drivers/1/career-stats?year=2021 http/1.1"));
        assert!(head.contains("authorization: bearer secret-token"));
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let (base, _request) = serve_once("404 Not Found", r#"{"error":"Driver not found"}"#).await;
        let client = client(&base, ApiAuth::None);

        let err = client.fetch_stats(driver(77), StatQuery::Career).await.unwrap_err();
        match err {
            H2hError::Api { status, message } => {
                assert_eq!(status, Some(StatusCode::NOT_FOUND));
                assert_eq!(message, "Driver not found");
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }
}
