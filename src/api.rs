//! Client for the library REST API.
//!
//! Every call goes through [`ApiClient::request`], which turns an HTTP
//! exchange into either a JSON value or an [`ApiError`]. Error statuses are
//! ordinary failures carrying the server's `detail`; only a request that
//! could not complete at all becomes a transport error.

use crate::models::{
    Book, BookChanges, Confirmation, IssueRequest, NewBook, NewUser, ServiceInfo, Transaction,
    User, UserChanges,
};
use crate::transcript::ActivityLog;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Shown when the server sent an error without a usable `detail`
pub const GENERIC_ERROR: &str = "An unexpected error occurred";

/// Shown for every transport-level failure
pub const NETWORK_ERROR: &str = "Network error: unable to reach the library server";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A request relative to the API base address
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Add a query parameter; empty values are dropped
    pub fn param(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(value) = value {
            let value = value.to_string();
            if !value.trim().is_empty() {
                self.query.push((key.to_string(), value));
            }
        }
        self
    }

    pub fn json(mut self, body: &impl Serialize) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Transport(format!("failed to encode body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Absolute URL of this request against `base`
    pub fn url(&self, base: &str) -> Result<Url, url::ParseError> {
        let joined = format!("{}{}", base.trim_end_matches('/'), self.path);
        if self.query.is_empty() {
            Url::parse(&joined)
        } else {
            Url::parse_with_params(&joined, &self.query)
        }
    }
}

/// Status and body of a completed HTTP exchange, whatever the status
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Io(String),
}

/// Moves requests over the wire. The HTTP agent in production, an in-memory
/// fake in tests.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server answered with a non-success status
    #[error("{detail}")]
    Application { status: u16, detail: String },
    /// The exchange did not complete or produced an unreadable answer
    #[error("{}", NETWORK_ERROR)]
    Transport(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Application { status: 404, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Application { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }
}

/// Pull a user-facing message out of an error body.
///
/// A string `detail` is used verbatim. A list (request validation errors)
/// is flattened to its `msg` entries.
pub fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return GENERIC_ERROR.to_string();
    };
    match value.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                GENERIC_ERROR.to_string()
            } else {
                messages.join("; ")
            }
        }
        _ => GENERIC_ERROR.to_string(),
    }
}

/// HTTP transport backed by a `ureq` agent
pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        let url = request.url(&self.base_url)?;
        let call = self
            .agent
            .request_url(request.method.as_str(), &url)
            .set("Accept", "application/json");

        let result = match &request.body {
            Some(body) => call.send_json(body),
            None => call.call(),
        };

        match result {
            Ok(resp) | Err(ureq::Error::Status(_, resp)) => {
                let status = resp.status();
                let body = resp
                    .into_string()
                    .map_err(|e| TransportError::Io(format!("failed to read body: {}", e)))?;
                Ok(RawResponse { status, body })
            }
            Err(e) => Err(TransportError::Io(e.to_string())),
        }
    }
}

/// Typed access to every endpoint of the library API
pub struct ApiClient {
    base_url: String,
    transport: Box<dyn Transport>,
    log: ActivityLog,
    debug: bool,
}

impl ApiClient {
    pub fn new(base_url: &str, transport: Box<dyn Transport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            log: ActivityLog::disabled(),
            debug: false,
        }
    }

    pub fn with_log(mut self, log: ActivityLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one exchange and classify the outcome
    pub fn request(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = request
            .url(&self.base_url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base_url, request.path));
        self.log.request(request.method.as_str(), &url);
        if self.debug {
            eprintln!("[DEBUG] {} {}", request.method.as_str(), url);
        }

        let response = match self.transport.send(request) {
            Ok(r) => r,
            Err(e) => {
                self.log.transport_error(&url, &e.to_string());
                if self.debug {
                    eprintln!("[DEBUG] transport error: {}", e);
                }
                return Err(ApiError::Transport(e.to_string()));
            }
        };

        self.log.response(&url, response.status);
        if self.debug {
            eprintln!("[DEBUG] -> {} {}", response.status, response.body);
        }

        if !response.is_success() {
            return Err(ApiError::Application {
                status: response.status,
                detail: error_detail(&response.body),
            });
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body)
            .map_err(|e| ApiError::Transport(format!("malformed response: {}", e)))
    }

    fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let value = self.request(&request)?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::Transport(format!("unexpected response shape: {}", e)))
    }

    pub fn service_info(&self) -> Result<ServiceInfo, ApiError> {
        self.fetch(ApiRequest::get("/"))
    }

    pub fn list_books(&self, query: &ListQuery) -> Result<Vec<Book>, ApiError> {
        self.fetch(query.apply(ApiRequest::get("/books/")))
    }

    pub fn get_book(&self, id: i64) -> Result<Book, ApiError> {
        self.fetch(ApiRequest::get(format!("/books/{}", id)))
    }

    pub fn create_book(&self, book: &NewBook) -> Result<Book, ApiError> {
        self.fetch(ApiRequest::post("/books/").json(book)?)
    }

    pub fn update_book(&self, id: i64, changes: &BookChanges) -> Result<Book, ApiError> {
        self.fetch(ApiRequest::put(format!("/books/{}", id)).json(changes)?)
    }

    pub fn delete_book(&self, id: i64) -> Result<Confirmation, ApiError> {
        self.fetch(ApiRequest::delete(format!("/books/{}", id)))
    }

    pub fn toggle_availability(&self, id: i64) -> Result<Book, ApiError> {
        self.fetch(ApiRequest::put(format!("/books/{}/toggle-availability", id)))
    }

    pub fn list_users(&self, query: &ListQuery) -> Result<Vec<User>, ApiError> {
        self.fetch(query.apply(ApiRequest::get("/users/")))
    }

    pub fn get_user(&self, id: i64) -> Result<User, ApiError> {
        self.fetch(ApiRequest::get(format!("/users/{}", id)))
    }

    pub fn create_user(&self, user: &NewUser) -> Result<User, ApiError> {
        self.fetch(ApiRequest::post("/users/").json(user)?)
    }

    pub fn update_user(&self, id: i64, changes: &UserChanges) -> Result<User, ApiError> {
        self.fetch(ApiRequest::put(format!("/users/{}", id)).json(changes)?)
    }

    pub fn delete_user(&self, id: i64) -> Result<Confirmation, ApiError> {
        self.fetch(ApiRequest::delete(format!("/users/{}", id)))
    }

    pub fn user_transactions(&self, id: i64) -> Result<Vec<Transaction>, ApiError> {
        self.fetch(ApiRequest::get(format!("/users/{}/transactions/", id)))
    }

    pub fn list_transactions(&self, query: &ListQuery) -> Result<Vec<Transaction>, ApiError> {
        self.fetch(query.apply(ApiRequest::get("/transactions/")))
    }

    pub fn issue_book(&self, issue: &IssueRequest) -> Result<Transaction, ApiError> {
        self.fetch(ApiRequest::post("/transactions/issue/").json(issue)?)
    }

    pub fn return_book(&self, transaction_id: i64) -> Result<Transaction, ApiError> {
        self.fetch(ApiRequest::put(format!(
            "/transactions/{}/return/",
            transaction_id
        )))
    }
}

/// Search, ordering and paging parameters of the list endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn apply(&self, request: ApiRequest) -> ApiRequest {
        request
            .param("query", self.query.as_deref())
            .param("sort_by", self.sort_by.as_deref())
            .param("skip", self.skip)
            .param("limit", self.limit)
    }
}
