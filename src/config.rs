use std::time::Duration;

use http::header::HeaderName;

use crate::{Error, Result};

pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const CLIENT_ID_ENV: &str = "WEIBO_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "WEIBO_CLIENT_SECRET";
pub const REDIRECT_URI_ENV: &str = "WEIBO_REDIRECT_URI";
/// CGI-style peer address, used as the caller IP when present.
pub const REMOTE_ADDR_ENV: &str = "REMOTE_ADDR";

/// Caller IP reported when none is configured.
pub const DEFAULT_REMOTE_IP: &str = "127.0.0.1";

/// Where the client runs; decides which header carries the caller IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// Regular hosting, sends `API-RemoteIP`.
    Standard,
    /// Sina App Engine sandbox, sends `SaeRemoteIP`.
    Sandboxed,
}

impl Deployment {
    /// `API-RemoteIP` or `SaeRemoteIP`, in the lower-cased form `http` stores.
    pub fn remote_ip_header(self) -> HeaderName {
        match self {
            Deployment::Standard => HeaderName::from_static("api-remoteip"),
            Deployment::Sandboxed => HeaderName::from_static("saeremoteip"),
        }
    }
}

impl Default for Deployment {
    fn default() -> Self {
        Deployment::Standard
    }
}

/// Remote endpoints used by the client.
///
/// Relative request paths are resolved as `{api_host}{path}.{format}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_host: String,
    pub format: String,
    pub authorize_url: String,
    pub access_token_url: String,
    pub user_info_url: String,
    pub share_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            api_host: "https://api.weibo.com/2/".to_string(),
            format: "json".to_string(),
            authorize_url: "https://api.weibo.com/oauth2/authorize".to_string(),
            access_token_url: "https://api.weibo.com/oauth2/access_token".to_string(),
            user_info_url: "https://api.weibo.com/2/users/show.json".to_string(),
            share_url: "https://api.weibo.com/2/statuses/share.json".to_string(),
        }
    }
}

impl Endpoints {
    /// Points every endpoint at `base`, keeping the default paths.
    ///
    /// Mostly useful for staging hosts and local mock servers.
    pub fn with_base<T: AsRef<str>>(base: T) -> Self {
        let base = base.as_ref().trim_end_matches('/');
        Endpoints {
            api_host: format!("{}/2/", base),
            format: "json".to_string(),
            authorize_url: format!("{}/oauth2/authorize", base),
            access_token_url: format!("{}/oauth2/access_token", base),
            user_info_url: format!("{}/2/users/show.json", base),
            share_url: format!("{}/2/statuses/share.json", base),
        }
    }
}

/// Application credentials and transport tunables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    timeout: Duration,
    connect_timeout: Duration,
    verify_peer: bool,
    decode_json: bool,
    debug: bool,
    endpoints: Endpoints,
    deployment: Deployment,
    remote_ip: String,
}

impl ClientConfig {
    pub fn new<TId, TSecret, TRedirect>(
        client_id: TId,
        client_secret: TSecret,
        redirect_uri: TRedirect,
    ) -> Self
    where
        TId: Into<String>,
        TSecret: Into<String>,
        TRedirect: Into<String>,
    {
        ClientConfig {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            verify_peer: true,
            decode_json: true,
            debug: false,
            endpoints: Endpoints::default(),
            deployment: Deployment::default(),
            remote_ip: DEFAULT_REMOTE_IP.to_string(),
        }
    }

    /// Reads the credentials from `WEIBO_CLIENT_ID`, `WEIBO_CLIENT_SECRET`
    /// and `WEIBO_REDIRECT_URI`.
    ///
    /// `REMOTE_ADDR`, when set, becomes the caller IP.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{} is not set", key)))
        };
        let config = ClientConfig::new(
            read(CLIENT_ID_ENV)?,
            read(CLIENT_SECRET_ENV)?,
            read(REDIRECT_URI_ENV)?,
        );
        Ok(match lookup(REMOTE_ADDR_ENV).filter(|v| !v.is_empty()) {
            Some(ip) => config.remote_ip(ip),
            None => config,
        })
    }

    /// set the total request timeout
    pub fn timeout(self, timeout: Duration) -> Self {
        ClientConfig { timeout, ..self }
    }

    /// set the connect timeout
    pub fn connect_timeout(self, connect_timeout: Duration) -> Self {
        ClientConfig {
            connect_timeout,
            ..self
        }
    }

    /// Toggle TLS peer verification.
    ///
    /// # Note
    /// Turning this off accepts any certificate the server presents.
    pub fn verify_peer(self, verify_peer: bool) -> Self {
        ClientConfig {
            verify_peer,
            ..self
        }
    }

    /// When `false`, response bodies are always handed back as raw text.
    pub fn decode_json(self, decode_json: bool) -> Self {
        ClientConfig {
            decode_json,
            ..self
        }
    }

    /// Emit request/response traces through `tracing`.
    pub fn debug(self, debug: bool) -> Self {
        ClientConfig { debug, ..self }
    }

    pub fn endpoints(self, endpoints: Endpoints) -> Self {
        ClientConfig { endpoints, ..self }
    }

    pub fn deployment(self, deployment: Deployment) -> Self {
        ClientConfig { deployment, ..self }
    }

    /// IP address of the end user, reported to the API on every call.
    ///
    /// Defaults to [`DEFAULT_REMOTE_IP`].
    pub fn remote_ip<T: Into<String>>(self, remote_ip: T) -> Self {
        ClientConfig {
            remote_ip: remote_ip.into(),
            ..self
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn is_verify_peer(&self) -> bool {
        self.verify_peer
    }

    pub fn is_decode_json(&self) -> bool {
        self.decode_json
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn get_endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn get_deployment(&self) -> Deployment {
        self.deployment
    }

    pub fn get_remote_ip(&self) -> &str {
        &self.remote_ip
    }
}
