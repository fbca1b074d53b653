use std::fmt::Display;

use async_trait::async_trait;
use cueline_core::SongId;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::{ClientError, ClientResult};

mod http;
pub use http::*;

#[cfg(test)]
pub mod mock;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    #[error("Could not connect: {0}")]
    Connect(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// The remote endpoints the client talks to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Exchanges a username and password for a credential pair
    Login,
    /// Exchanges a refresh credential for a new access credential
    Refresh,
    /// The operating mode of the server
    Mode,
    /// The profile of the logged in user
    Identity,
    Coins,
    /// All three stages of the queue
    QueueSnapshot,
    CurrentSong,
    Submit,
    Skip,
    Song(SongId),
    Vote(SongId),
    Users,
    User(String),
    SetCoins(String),
    AddCoins(String),
    ChangePassword,
}

/// How a request is authorized
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    Bearer(String),
    Basic { username: String, password: String },
}

/// A request before it is sent, independent of the transport
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub body: Option<Value>,
    pub authorization: Option<Authorization>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Represents a type that can send requests to the queue server
#[async_trait]
pub trait Transport
where
    Self: 'static + Send + Sync,
{
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

impl Endpoint {
    /// Returns the path relative to the api root
    pub fn path(&self) -> String {
        match self {
            Endpoint::Login => "token".to_string(),
            Endpoint::Refresh => "token/refresh".to_string(),
            Endpoint::Mode => "public/mode".to_string(),
            Endpoint::Identity => "self".to_string(),
            Endpoint::Coins => "coins".to_string(),
            Endpoint::QueueSnapshot => "queue/all".to_string(),
            Endpoint::CurrentSong => "queue/current".to_string(),
            Endpoint::Submit => "queue".to_string(),
            Endpoint::Skip => "queue/skip".to_string(),
            Endpoint::Song(id) => format!("queue/{}", urlencoding::encode(id)),
            Endpoint::Vote(id) => format!("queue/{}/vote", urlencoding::encode(id)),
            Endpoint::Users => "users".to_string(),
            Endpoint::User(name) => format!("users/{}", urlencoding::encode(name)),
            Endpoint::SetCoins(name) => format!("users/{}/coins", urlencoding::encode(name)),
            Endpoint::AddCoins(name) => format!("users/{}/coins/add", urlencoding::encode(name)),
            Endpoint::ChangePassword => "self/password".to_string(),
        }
    }

    /// Returns true if the endpoint never carries an access credential.
    pub fn is_public(&self) -> bool {
        matches!(self, Endpoint::Login | Endpoint::Refresh | Endpoint::Mode)
    }
}

impl ApiRequest {
    pub fn new(method: Method, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            body: None,
            authorization: None,
        }
    }

    pub fn get(endpoint: Endpoint) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: Endpoint) -> Self {
        Self::new(Method::Post, endpoint)
    }

    pub fn put(endpoint: Endpoint) -> Self {
        Self::new(Method::Put, endpoint)
    }

    pub fn delete(endpoint: Endpoint) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.authorization = Some(Authorization::Bearer(token.into()));
        self
    }

    pub fn with_basic(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.authorization = Some(Authorization::Basic {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Returns the bearer token attached to the request, if any
    pub fn bearer(&self) -> Option<&str> {
        match &self.authorization {
            Some(Authorization::Bearer(token)) => Some(token),
            _ => None,
        }
    }
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns unsuccessful statuses into errors.
    pub fn error_for_status(self) -> ClientResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ClientError::from_status(self.status, &self.body))
        }
    }

    /// Decodes the body as json.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body).map_err(|e| ClientError::Malformed(e.to_string()))
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };

        f.write_str(name)
    }
}

// Credentials must never end up in logs
impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authorization::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            Authorization::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(Endpoint::QueueSnapshot.path(), "queue/all");
        assert_eq!(Endpoint::Vote("a b".to_string()).path(), "queue/a%20b/vote");
        assert_eq!(
            Endpoint::AddCoins("mary".to_string()).path(),
            "users/mary/coins/add"
        );
    }

    #[test]
    fn test_public_endpoints() {
        assert!(Endpoint::Login.is_public());
        assert!(Endpoint::Refresh.is_public());
        assert!(Endpoint::Mode.is_public());
        assert!(!Endpoint::QueueSnapshot.is_public());
        assert!(!Endpoint::Identity.is_public());
    }

    #[test]
    fn test_authorization_is_redacted() {
        let request = ApiRequest::get(Endpoint::Identity).with_bearer("secret-token");
        let debug = format!("{:?}", request);

        assert!(!debug.contains("secret-token"));
        assert_eq!(request.bearer(), Some("secret-token"));
    }

    #[test]
    fn test_error_for_status() {
        assert!(ApiResponse::new(204, "").error_for_status().is_ok());
        assert_eq!(
            ApiResponse::new(401, "").error_for_status(),
            Err(ClientError::Unauthorized)
        );
    }
}
