//! API gateway client: every outbound call to the captioning service.
//!
//! `call` is the single request path. It enforces the local token check
//! for authenticated routes, decodes JSON or plain-text payloads, and
//! turns non-2xx responses into typed errors carrying the server's own
//! message. The typed endpoint methods below are thin wrappers.

use crate::error::{ClientError, Result};
use crate::models::{
    AuthResponse, Caption, EndpointStat, LoginRequest, SignupRequest, StatsResponse, User,
    UsersResponse,
};
use crate::session::SessionStore;
use crate::transport::{ApiRequest, FileUpload, Method, RawResponse, RequestBody, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// Deserialize a JSON payload into `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Payload::Json(value) => Ok(serde_json::from_value(value)?),
            Payload::Text(text) => Err(ClientError::Decode(format!(
                "expected JSON, got text: {}",
                truncate(&text, 80)
            ))),
        }
    }

    /// The `message` of a JSON payload, or the text itself.
    pub fn message(&self) -> Option<String> {
        match self {
            Payload::Json(value) => value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            Payload::Text(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Payload::Text(_) => None,
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false)
}

/// Decode a body according to its content type.
pub fn parse_payload(content_type: Option<&str>, body: &str) -> Result<Payload> {
    if is_json(content_type) {
        if body.trim().is_empty() {
            return Ok(Payload::Json(Value::Null));
        }
        Ok(Payload::Json(serde_json::from_str(body)?))
    } else {
        Ok(Payload::Text(body.to_string()))
    }
}

/// Pick the most specific message a failed response offers:
/// `error` (serialized when it is not a string), then `message`, then
/// the raw body, then the status text.
pub fn error_message(response: &RawResponse) -> String {
    let payload = parse_payload(response.content_type.as_deref(), &response.body)
        .unwrap_or_else(|_| Payload::Text(response.body.clone()));

    let structured = match &payload {
        Payload::Json(value) => match value.get("error") {
            Some(Value::String(error)) if !error.is_empty() => Some(error.clone()),
            Some(error) if !error.is_null() && !error.is_string() => Some(error.to_string()),
            _ => value
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        Payload::Text(_) => None,
    };

    structured
        .or_else(|| {
            let raw = response.body.trim();
            (!raw.is_empty()).then(|| raw.to_string())
        })
        .or_else(|| {
            let text = response.status_text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {}", response.status))
}

/// Map a response to a payload or a classified error.
pub fn decode_response(response: RawResponse) -> Result<Payload> {
    if response.is_success() {
        return parse_payload(response.content_type.as_deref(), &response.body);
    }

    let message = error_message(&response);
    Err(match response.status {
        401 | 403 => ClientError::Authorization {
            status: response.status,
            message,
        },
        429 => ClientError::RateLimited { message },
        status => ClientError::Api { status, message },
    })
}

/// Client for the remote captioning API.
#[derive(Clone)]
pub struct Gateway {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
}

impl Gateway {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Issue one request. Authenticated calls without a usable local
    /// token fail before anything is sent.
    pub async fn call(
        &self,
        path: &str,
        method: Method,
        body: RequestBody,
        authenticated: bool,
    ) -> Result<Payload> {
        let bearer = if authenticated {
            Some(
                self.session
                    .token()
                    .ok_or(ClientError::AuthenticationRequired)?,
            )
        } else {
            None
        };

        let request = ApiRequest {
            method,
            url: format!("{}{}", self.base_url, path),
            bearer,
            body,
        };

        tracing::debug!(method = %method, path, authenticated, "api request");
        let response = self.transport.send(request).await.map_err(|e| {
            tracing::debug!(method = %method, path, error = %e, "api request failed");
            e
        })?;
        tracing::debug!(method = %method, path, status = response.status, "api response");

        decode_response(response)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let body = serde_json::to_value(LoginRequest { username, password })?;
        self.call("/api/auth/login", Method::Post, RequestBody::Json(body), false)
            .await?
            .into_typed()
    }

    pub async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse> {
        let body = serde_json::to_value(SignupRequest {
            username,
            email,
            password,
        })?;
        self.call("/api/auth/create", Method::Post, RequestBody::Json(body), false)
            .await?
            .into_typed()
    }

    pub async fn verify(&self) -> Result<AuthResponse> {
        self.call("/api/auth/verify", Method::Post, RequestBody::Empty, true)
            .await?
            .into_typed()
    }

    pub async fn logout(&self) -> Result<Payload> {
        self.call("/api/auth/logout", Method::Post, RequestBody::Empty, true)
            .await
    }

    /// Fetch the authoritative record for one user. Accepts both a bare
    /// user object and one wrapped as `{"user": ...}`.
    pub async fn fetch_user(&self, id: u64) -> Result<User> {
        let payload = self
            .call(&format!("/api/users/{}", id), Method::Get, RequestBody::Empty, true)
            .await?;
        match payload {
            Payload::Json(Value::Object(mut map)) if map.get("user").is_some_and(Value::is_object) => {
                let user = map.remove("user").unwrap_or(Value::Null);
                Ok(serde_json::from_value(user)?)
            }
            other => other.into_typed(),
        }
    }

    pub async fn admin_users(&self) -> Result<Vec<User>> {
        let response: UsersResponse = self
            .call("/api/admin/users", Method::Get, RequestBody::Empty, true)
            .await?
            .into_typed()?;
        Ok(response.users)
    }

    pub async fn admin_stats(&self) -> Result<Vec<EndpointStat>> {
        let response: StatsResponse = self
            .call("/api/admin/stats", Method::Get, RequestBody::Empty, true)
            .await?
            .into_typed()?;
        Ok(response.stats)
    }

    /// Grant the admin role; returns the server's confirmation message.
    pub async fn promote_user(&self, id: u64) -> Result<String> {
        let payload = self
            .call(
                &format!("/api/admin/users/{}/promote", id),
                Method::Patch,
                RequestBody::Empty,
                true,
            )
            .await?;
        Ok(payload
            .message()
            .unwrap_or_else(|| "User promoted.".to_string()))
    }

    pub async fn delete_user(&self, id: u64) -> Result<String> {
        let payload = self
            .call(
                &format!("/api/admin/users/{}", id),
                Method::Delete,
                RequestBody::Empty,
                true,
            )
            .await?;
        Ok(payload
            .message()
            .unwrap_or_else(|| "User deleted.".to_string()))
    }

    pub async fn caption(&self, upload: FileUpload) -> Result<Caption> {
        self.call("/api/caption", Method::Post, RequestBody::Multipart(upload), true)
            .await?
            .into_typed()
    }
}
