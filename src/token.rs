use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Decoded, ExchangeError, ExchangeResult, ACCESS_TOKEN_KEY};

const ERROR_KEY: &str = "error";

/// Represents response of token acquisition.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Token {
    /// OAuth2 access token
    pub access_token: String,
    /// Refresh token, when the server hands one out
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Other contents
    #[serde(flatten)]
    pub remain: HashMap<String, Value>,
}

impl Token {
    pub fn new<T: Into<String>>(access_token: T) -> Self {
        Token {
            access_token: access_token.into(),
            refresh_token: None,
            remain: HashMap::new(),
        }
    }

    /// Id of the user who authorized the application.
    pub fn uid(&self) -> Option<String> {
        match self.remain.get("uid")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Lifetime of the access token in seconds.
    pub fn expires_in(&self) -> Option<u64> {
        match self.remain.get("expires_in")? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Validate a decoded token-exchange response.
///
/// Succeeds only for a JSON object that carries a string `access_token`
/// and no `error`.
pub(crate) fn read_token(decoded: Decoded) -> ExchangeResult<Token> {
    let map = match decoded {
        Decoded::Json(Value::Object(map)) => map,
        Decoded::Json(other) => return Err(ExchangeError::Malformed(other.to_string())),
        Decoded::Raw(text) => return Err(ExchangeError::Malformed(text)),
    };
    if let Some(error) = map.get(ERROR_KEY) {
        return Err(ExchangeError::Rejected(error_detail(error)));
    }
    if !matches!(map.get(ACCESS_TOKEN_KEY), Some(Value::String(_))) {
        return Err(ExchangeError::TokenKeyNotFound(
            ACCESS_TOKEN_KEY,
            Value::Object(map).to_string(),
        ));
    }
    from_map(map)
}

fn from_map(map: Map<String, Value>) -> ExchangeResult<Token> {
    let text = Value::Object(map);
    serde_json::from_value(text.clone())
        .map_err(|e| ExchangeError::Malformed(format!("{}: {}", e, text)))
}

fn error_detail(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
