use std::collections::BTreeMap;

use http::StatusCode;
use serde_json::Value;

/// What came back from one transport call, whatever the status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
    url: String,
}

impl HttpResponse {
    pub fn new(
        status: StatusCode,
        headers: BTreeMap<String, String>,
        body: Vec<u8>,
        url: String,
    ) -> Self {
        HttpResponse {
            status,
            headers,
            body,
            url,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers keyed by lower-cased name.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Final URL after redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn decode(&self, structured: bool) -> Decoded {
        decode(&self.body, structured)
    }
}

/// A response body, parsed as JSON when possible.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Json(Value),
    Raw(String),
}

impl Decoded {
    pub fn is_json(&self) -> bool {
        matches!(self, Decoded::Json(_))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Decoded::Json(v) => Some(v),
            Decoded::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Decoded::Json(v) => Some(v),
            Decoded::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Decoded::Json(_) => None,
            Decoded::Raw(s) => Some(s),
        }
    }
}

/// Parse `raw` as JSON when `structured` is set.
///
/// Bodies that are not JSON come back as text instead of failing.
pub fn decode(raw: &[u8], structured: bool) -> Decoded {
    if structured {
        if let Ok(value) = serde_json::from_slice::<Value>(raw) {
            return Decoded::Json(value);
        }
    }
    Decoded::Raw(String::from_utf8_lossy(raw).into_owned())
}
