//! Request and response types for [`FetchClient`](crate::FetchClient).

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::error::FetchError;

/// Retry budget used when a request does not set one.
pub const DEFAULT_RETRIES: u32 = 3;

/// HTTP method subset used by the catalog providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl From<Method> for reqwest::Method {
    fn from(m: Method) -> Self {
        match m {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        }
    }
}

/// Request body encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    Raw { content_type: String, data: String },
}

/// User-Agent handling for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UserAgent {
    /// The client's browser-like default.
    #[default]
    Default,
    Custom(String),
    /// Send no User-Agent header at all (some APIs reject browser agents).
    Omit,
}

/// A single logical request; the client may issue it several times.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    pub user_agent: UserAgent,
    /// Number of retries after the first attempt.
    pub retries: u32,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            headers: Vec::new(),
            cookies: Vec::new(),
            user_agent: UserAgent::Default,
            retries: DEFAULT_RETRIES,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.push((name.to_string(), value.into()));
        self
    }

    pub fn user_agent(mut self, user_agent: UserAgent) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn json_body(mut self, value: serde_json::Value) -> Self {
        self.body = Some(Body::Json(value));
        self
    }

    pub fn form_body<K: Into<String>, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.body = Some(Body::Form(
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        ));
        self
    }

    pub fn raw_body(mut self, content_type: &str, data: impl Into<String>) -> Self {
        self.body = Some(Body::Raw {
            content_type: content_type.to_string(),
            data: data.into(),
        });
        self
    }
}

/// A decoded HTTP response. Non-2xx statuses are returned, not raised.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    /// Body decoded using the declared charset (UTF-8 when none).
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Whether this looks like an anti-bot challenge page.
    pub fn is_challenge(&self) -> bool {
        self.status == 403
            && (self.headers.contains_key("cf-ray") || self.headers.contains_key("cf-mitigated"))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        Ok(serde_json::from_str(&self.body)?)
    }
}
