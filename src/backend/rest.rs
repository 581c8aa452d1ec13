/// HTTPS client for the hosted auth + document service
///
/// Provides:
/// - Password sign-in against the identity endpoint
/// - CRUD on one document collection
/// - Bearer token reuse, renewed with the refresh token once it expires

use crate::backend::document::{Document, ListDocumentsResponse};
use crate::backend::{is_valid_id, Backend};
use crate::core::{BridgeConfig, Credential, EventBus, Record, RecordFields, SessionChange, SessionUser};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// Token lifetime assumed when the backend omits `expiresIn`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    #[serde(default)]
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

/// Token endpoint reply; unlike sign-in it uses snake_case keys
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Signed-in user's id token and the refresh token that renews it
#[derive(Debug, Clone)]
struct IdToken {
    value: String,
    refresh_token: Option<String>,
    expires_at: DateTime<Utc>,
}

impl IdToken {
    fn new(
        value: String,
        refresh_token: Option<String>,
        expires_in: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let secs = expires_in
            .and_then(|s| s.parse::<i64>().ok())
            .map(|s| s.clamp(0, MAX_TOKEN_LIFETIME_SECS))
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        Self {
            value,
            refresh_token,
            expires_at: now + ChronoDuration::seconds(secs),
        }
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Backend talking to the hosted service over HTTPS
pub struct RestBackend {
    client: reqwest::Client,
    api_key: String,
    auth_endpoint: String,
    token_endpoint: String,
    collection_url: Url,
    token: Mutex<Option<IdToken>>,
    events: EventBus,
}

impl RestBackend {
    /// Create a client for the configured project and collection
    ///
    /// # Errors
    /// - `BridgeError::Http`: the HTTP client could not be built
    /// - `BridgeError::ConfigError`: the document endpoint is not a usable base URL
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let collection_url = collection_url(
            &config.firestore_endpoint,
            &config.project_id,
            &config.collection,
        )?;

        debug!("Collection URL: {}", collection_url);

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            auth_endpoint: config.auth_endpoint.trim_end_matches('/').to_string(),
            token_endpoint: config.token_endpoint.trim_end_matches('/').to_string(),
            collection_url,
            token: Mutex::new(None),
            events: EventBus::new(),
        })
    }

    /// URL of one document; the id is percent-encoded as a single segment
    fn document_url(&self, id: &str) -> Result<Url> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BridgeError::Internal(format!("{} cannot take path segments", self.collection_url))
            })?
            .push(id);
        Ok(url)
    }

    /// Attach the bearer token, renewing it first if it has expired
    ///
    /// Requests before sign-in go out unauthenticated. When renewal fails
    /// the session is dropped and a signed-out change is published.
    ///
    /// # Errors
    /// - `BridgeError::NotSignedIn`: the held token expired and could not be renewed
    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let mut token = self.token.lock().await;

        let refresh_token = match token.as_ref() {
            None => return Ok(builder),
            Some(current) if current.is_valid_at(Utc::now()) => {
                return Ok(builder.bearer_auth(&current.value));
            }
            Some(expired) => expired.refresh_token.clone(),
        };

        match self.refresh(refresh_token.as_deref()).await {
            Ok(renewed) => {
                let builder = builder.bearer_auth(&renewed.value);
                *token = Some(renewed);
                Ok(builder)
            }
            Err(e) => {
                warn!("Could not renew expired id token: {}", e);
                *token = None;
                self.events.publish(SessionChange::signed_out());
                Err(BridgeError::NotSignedIn)
            }
        }
    }

    /// Exchange a refresh token for a fresh id token
    async fn refresh(&self, refresh_token: Option<&str>) -> Result<IdToken> {
        let refresh_token = refresh_token.ok_or(BridgeError::NotSignedIn)?;
        let url = format!("{}/token", self.token_endpoint);
        debug!("Renewing expired id token");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await?;

        let renewed: RefreshResponse = Self::check(response).await?.json().await?;
        info!("Id token renewed");

        Ok(IdToken::new(
            renewed.id_token,
            renewed.refresh_token.or_else(|| Some(refresh_token.to_string())),
            renewed.expires_in.as_deref(),
            Utc::now(),
        ))
    }

    /// Turn non-2xx responses into `BridgeError::Status`
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Backend returned {}: {}", status, body);
        Err(BridgeError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// `{endpoint}/projects/{project}/databases/(default)/documents/{collection}`
fn collection_url(endpoint: &str, project_id: &str, collection: &str) -> Result<Url> {
    let invalid = |reason: String| BridgeError::ConfigError {
        field: "firestore_endpoint".to_string(),
        reason,
    };

    let mut url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("'{}' cannot be a base URL", endpoint)))?
        .pop_if_empty()
        .extend(["projects", project_id, "databases", "(default)", "documents", collection]);

    Ok(url)
}

#[async_trait]
impl Backend for RestBackend {
    async fn authenticate(&self, credential: &Credential) -> Result<SessionUser> {
        let url = format!("{}/accounts:signInWithPassword", self.auth_endpoint);
        info!("Signing in '{}'", credential.identifier);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&SignInRequest {
                email: &credential.identifier,
                password: &credential.secret,
                return_secure_token: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("status {}", status.as_u16()));

            return match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Err(BridgeError::AuthRejected {
                        identifier: credential.identifier.clone(),
                        reason,
                    })
                }
                _ => {
                    error!("Sign-in failed with status {}", status);
                    Err(BridgeError::Status {
                        status: status.as_u16(),
                        body,
                    })
                }
            };
        }

        let signed_in: SignInResponse = response.json().await?;
        let identifier = if signed_in.email.is_empty() {
            credential.identifier.clone()
        } else {
            signed_in.email
        };

        *self.token.lock().await = Some(IdToken::new(
            signed_in.id_token,
            signed_in.refresh_token,
            signed_in.expires_in.as_deref(),
            Utc::now(),
        ));

        info!("Signed in as '{}'", identifier);
        self.events.publish(SessionChange::signed_in(identifier.clone()));

        Ok(SessionUser { identifier })
    }

    fn subscribe_session(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }

    async fn insert(&self, fields: &RecordFields) -> Result<Record> {
        let request = self
            .client
            .post(self.collection_url.clone())
            .json(&Document::from_fields(fields));

        let response = Self::check(self.authorized(request).await?.send().await?).await?;
        let record = response.json::<Document>().await?.into_record()?;

        debug!("Inserted record {}", record.id);
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<Record>> {
        if !is_valid_id(id) {
            return Ok(None);
        }

        let request = self.client.get(self.document_url(id)?);
        let response = self.authorized(request).await?.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("Record {} not found", id);
            return Ok(None);
        }

        let document = Self::check(response).await?.json::<Document>().await?;
        Ok(Some(document.into_record()?))
    }

    async fn get_all(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(self.collection_url.clone());
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = Self::check(self.authorized(request).await?.send().await?).await?;
            let page: ListDocumentsResponse = response.json().await?;

            for document in page.documents {
                records.push(document.into_record()?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Listed {} records", records.len());
        Ok(records)
    }

    async fn update(&self, id: &str, fields: &RecordFields) -> Result<()> {
        if !is_valid_id(id) {
            return Err(BridgeError::RecordNotFound { id: id.to_string() });
        }

        let request = self
            .client
            .patch(self.document_url(id)?)
            .query(&[
                ("updateMask.fieldPaths", "title"),
                ("updateMask.fieldPaths", "description"),
                ("currentDocument.exists", "true"),
            ])
            .json(&Document::from_fields(fields));

        let response = self.authorized(request).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BridgeError::RecordNotFound { id: id.to_string() });
        }

        Self::check(response).await?;
        debug!("Updated record {}", id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        if !is_valid_id(id) {
            return Err(BridgeError::RecordNotFound { id: id.to_string() });
        }

        let request = self
            .client
            .delete(self.document_url(id)?)
            .query(&[("currentDocument.exists", "true")]);

        let response = self.authorized(request).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(BridgeError::RecordNotFound { id: id.to_string() });
        }

        Self::check(response).await?;
        debug!("Deleted record {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Read one HTTP request (head + content-length body)
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);

                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }

        String::from_utf8_lossy(&buf).to_string()
    }

    /// Serve canned responses, one connection each, returning the requests seen
    async fn mock_server(replies: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut socket).await);

                let reply = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
            seen
        });

        (format!("http://{}", addr), handle)
    }

    fn backend_for(base: &str) -> RestBackend {
        let config = BridgeConfig::builder()
            .api_key("key-123")
            .project_id("demo")
            .auth_endpoint(base)
            .firestore_endpoint(base)
            .token_endpoint(base)
            .timeout_secs(5)
            .build()
            .unwrap();
        RestBackend::new(&config).unwrap()
    }

    fn sign_in_body() -> String {
        r#"{"localId":"u1","email":"ann@example.com","idToken":"tok-1","refreshToken":"rt-1","expiresIn":"3600"}"#
            .to_string()
    }

    /// Put the backend in a signed-in state whose id token has already expired
    async fn expire_session(backend: &RestBackend, refresh_token: Option<&str>) {
        *backend.token.lock().await = Some(IdToken::new(
            "stale".to_string(),
            refresh_token.map(str::to_string),
            Some("0"),
            Utc::now(),
        ));
    }

    fn record_doc() -> String {
        r#"{"name":"projects/demo/databases/(default)/documents/records/r1","fields":{"title":{"stringValue":"A"},"description":{"stringValue":"B"}}}"#
            .to_string()
    }

    #[test]
    fn test_id_token_expiry() {
        let now = Utc::now();
        let token = IdToken::new("t".to_string(), None, Some("60"), now);

        assert!(token.is_valid_at(now));
        assert!(!token.is_valid_at(now + ChronoDuration::seconds(61)));

        let fallback = IdToken::new("t".to_string(), None, Some("garbage"), now);
        assert_eq!(fallback.expires_at, now + ChronoDuration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));
    }

    #[test]
    fn test_collection_url() {
        let backend = backend_for("http://localhost:9099/");
        assert_eq!(
            backend.document_url("abc").unwrap().as_str(),
            "http://localhost:9099/projects/demo/databases/(default)/documents/records/abc"
        );
    }

    #[test]
    fn test_document_url_escapes_reserved_characters() {
        let backend = backend_for("http://localhost:9099/v1");
        let url = backend.document_url("r1#x?y=%41").unwrap();

        assert_eq!(
            url.as_str(),
            "http://localhost:9099/v1/projects/demo/databases/(default)/documents/records/r1%23x%3Fy=%2541"
        );
        assert_eq!(url.fragment(), None, "Id must not leak into the fragment");
        assert_eq!(url.query(), None, "Id must not leak into the query");
    }

    #[test]
    fn test_unusable_endpoint_is_config_error() {
        assert!(matches!(
            collection_url("http//missing-colon", "demo", "records"),
            Err(BridgeError::ConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_authenticate_success_publishes_session() {
        let (base, server) = mock_server(vec![("200 OK", sign_in_body())]).await;
        let backend = backend_for(&base);
        let mut sessions = backend.subscribe_session();

        let user = backend
            .authenticate(&Credential::new("ann@example.com", "pw"))
            .await
            .unwrap();
        assert_eq!(user.identifier, "ann@example.com");
        assert_eq!(sessions.recv().await.unwrap(), SessionChange::signed_in("ann@example.com"));

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /accounts:signInWithPassword?key=key-123"));
        assert!(requests[0].contains(r#""returnSecureToken":true"#));
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let body = r#"{"error":{"code":400,"message":"INVALID_PASSWORD"}}"#.to_string();
        let (base, _server) = mock_server(vec![("400 Bad Request", body)]).await;
        let backend = backend_for(&base);

        let result = backend
            .authenticate(&Credential::new("ann@example.com", "bad"))
            .await;

        assert!(matches!(
            result,
            Err(BridgeError::AuthRejected { ref reason, .. }) if reason == "INVALID_PASSWORD"
        ));
    }

    #[tokio::test]
    async fn test_requests_carry_bearer_after_sign_in() {
        let (base, server) =
            mock_server(vec![("200 OK", sign_in_body()), ("200 OK", record_doc())]).await;
        let backend = backend_for(&base);

        backend
            .authenticate(&Credential::new("ann@example.com", "pw"))
            .await
            .unwrap();
        let record = backend.get("r1").await.unwrap().unwrap();

        assert_eq!(record, Record::new("r1", RecordFields::new("A", "B")));

        let requests = server.await.unwrap();
        assert!(requests[1].starts_with("GET /projects/demo/databases/(default)/documents/records/r1"));
        assert!(requests[1].to_lowercase().contains("authorization: bearer tok-1"));
    }

    #[tokio::test]
    async fn test_reserved_characters_in_id_hit_escaped_path() {
        let (base, server) = mock_server(vec![
            ("404 Not Found", "{}".to_string()),
            ("404 Not Found", "{}".to_string()),
            ("404 Not Found", "{}".to_string()),
        ])
        .await;
        let backend = backend_for(&base);

        assert_eq!(backend.get("r1#missing").await.unwrap(), None);
        assert!(matches!(
            backend.delete("r1?x=1").await,
            Err(BridgeError::RecordNotFound { .. })
        ));
        assert!(matches!(
            backend.update("50%off", &RecordFields::default()).await,
            Err(BridgeError::RecordNotFound { .. })
        ));

        let requests = server.await.unwrap();
        assert!(
            requests[0].starts_with("GET /projects/demo/databases/(default)/documents/records/r1%23missing HTTP/1.1"),
            "Unexpected request line: {}",
            requests[0]
        );
        assert!(
            requests[1].starts_with(
                "DELETE /projects/demo/databases/(default)/documents/records/r1%3Fx=1?currentDocument.exists=true "
            ),
            "Unexpected request line: {}",
            requests[1]
        );
        assert!(
            requests[2].starts_with("PATCH /projects/demo/databases/(default)/documents/records/50%25off?"),
            "Unexpected request line: {}",
            requests[2]
        );
    }

    #[tokio::test]
    async fn test_expired_token_is_renewed() {
        let renewed = r#"{"id_token":"tok-2","refresh_token":"rt-2","expires_in":"3600","user_id":"u1"}"#;
        let (base, server) =
            mock_server(vec![("200 OK", renewed.to_string()), ("200 OK", record_doc())]).await;
        let backend = backend_for(&base);
        expire_session(&backend, Some("rt-1")).await;

        let record = backend.get("r1").await.unwrap();
        assert_eq!(record, Some(Record::new("r1", RecordFields::new("A", "B"))));

        let held = backend.token.lock().await.clone().unwrap();
        assert_eq!(held.value, "tok-2");
        assert_eq!(held.refresh_token.as_deref(), Some("rt-2"));

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /token?key=key-123"));
        assert!(requests[0].contains("grant_type=refresh_token&refresh_token=rt-1"));
        assert!(requests[1].to_lowercase().contains("authorization: bearer tok-2"));
    }

    #[tokio::test]
    async fn test_failed_renewal_signs_out() {
        let body = r#"{"error":{"code":400,"message":"TOKEN_EXPIRED"}}"#.to_string();
        let (base, _server) = mock_server(vec![("400 Bad Request", body)]).await;
        let backend = backend_for(&base);
        let mut sessions = backend.subscribe_session();
        expire_session(&backend, Some("rt-1")).await;

        assert!(matches!(backend.get("r1").await, Err(BridgeError::NotSignedIn)));
        assert_eq!(sessions.recv().await.unwrap(), SessionChange::signed_out());
        assert!(backend.token.lock().await.is_none(), "Session should be dropped");
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_token_signs_out() {
        let backend = backend_for("http://127.0.0.1:9");
        let mut sessions = backend.subscribe_session();
        expire_session(&backend, None).await;

        assert!(matches!(backend.get_all().await, Err(BridgeError::NotSignedIn)));
        assert_eq!(sessions.recv().await.unwrap(), SessionChange::signed_out());
    }

    #[tokio::test]
    async fn test_get_not_found_is_none() {
        let (base, _server) = mock_server(vec![("404 Not Found", "{}".to_string())]).await;
        let backend = backend_for(&base);

        assert_eq!(backend.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_invalid_id_skips_network() {
        let backend = backend_for("http://127.0.0.1:9");
        assert_eq!(backend.get("a/b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_returns_assigned_id() {
        let doc = r#"{"name":"projects/demo/databases/(default)/documents/records/new1","fields":{"title":{"stringValue":"A"},"description":{"stringValue":"B"}}}"#;
        let (base, server) = mock_server(vec![("200 OK", doc.to_string())]).await;
        let backend = backend_for(&base);

        let record = backend.insert(&RecordFields::new("A", "B")).await.unwrap();
        assert_eq!(record.id, "new1");

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /projects/demo/databases/(default)/documents/records "));
        assert!(requests[0].contains(r#""stringValue":"A""#));
    }

    #[tokio::test]
    async fn test_get_all_follows_pages() {
        let page1 = r#"{"documents":[{"name":"p/records/a","fields":{"title":{"stringValue":"one"}}}],"nextPageToken":"next"}"#;
        let page2 = r#"{"documents":[{"name":"p/records/b","fields":{"title":{"stringValue":"two"}}}]}"#;
        let (base, server) = mock_server(vec![
            ("200 OK", page1.to_string()),
            ("200 OK", page2.to_string()),
        ])
        .await;
        let backend = backend_for(&base);

        let records = backend.get_all().await.unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two"]);

        let requests = server.await.unwrap();
        assert!(requests[1].contains("pageToken=next"));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_record() {
        let (base, _server) = mock_server(vec![
            ("404 Not Found", "{}".to_string()),
            ("404 Not Found", "{}".to_string()),
        ])
        .await;
        let backend = backend_for(&base);

        assert!(matches!(
            backend.update("gone", &RecordFields::default()).await,
            Err(BridgeError::RecordNotFound { .. })
        ));
        assert!(matches!(
            backend.delete("gone").await,
            Err(BridgeError::RecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_server_error_becomes_status() {
        let (base, _server) =
            mock_server(vec![("500 Internal Server Error", "boom".to_string())]).await;
        let backend = backend_for(&base);

        assert!(matches!(
            backend.get_all().await,
            Err(BridgeError::Status { status: 500, .. })
        ));
    }
}
