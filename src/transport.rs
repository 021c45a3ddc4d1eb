use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::io;

use http::HeaderMap;
use reqwest::{blocking::Client as ReqwestClient, redirect::Policy};

use crate::{ClientConfig, Error, HttpResponse, PreparedRequest, Result};

const TRACE_TARGET: &str = "weibo_oauth2";

/// Sends a prepared request and hands back the raw response.
///
/// Implementations make exactly one attempt and return non-2xx responses,
/// redirects included, as `Ok`.
pub trait Transport {
    fn send(&self, request: PreparedRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: PreparedRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, request: PreparedRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

/// [`Transport`] backed by `reqwest::blocking::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: ReqwestClient,
    verify_peer: bool,
}

impl ReqwestTransport {
    /// Build a client honoring the timeouts and TLS setting of `config`.
    ///
    /// Redirects are not followed.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let builder = ReqwestClient::builder()
            .timeout(config.get_timeout())
            .connect_timeout(config.get_connect_timeout())
            .redirect(Policy::none());
        #[cfg(any(feature = "default-tls", feature = "rustls-tls"))]
        let builder = builder.danger_accept_invalid_certs(!config.is_verify_peer());
        let inner = builder.build().map_err(Error::Transport)?;
        Ok(ReqwestTransport {
            inner,
            verify_peer: config.is_verify_peer(),
        })
    }

    /// Wrap an already configured client.
    pub fn new_with_client(client: ReqwestClient, verify_peer: bool) -> Self {
        ReqwestTransport {
            inner: client,
            verify_peer,
        }
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if self.verify_peer && is_certificate_error(&err) {
            Error::TlsVerification(err)
        } else {
            Error::Transport(err)
        }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: PreparedRequest) -> Result<HttpResponse> {
        let (method, url, headers, body) = request.into_parts();
        let mut builder = self.inner.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let resp = builder.send().map_err(|e| self.classify(e))?;

        let status = resp.status();
        let url = resp.url().to_string();
        let headers = normalize_headers(resp.headers());
        let body = resp.bytes().map_err(|e| self.classify(e))?.to_vec();
        Ok(HttpResponse::new(status, headers, body, url))
    }
}

/// Lower-cased header names; the last value wins for repeated headers.
pub(crate) fn normalize_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut normalized = BTreeMap::new();
    for (name, value) in headers.iter() {
        normalized.insert(
            name.as_str().to_ascii_lowercase(),
            String::from_utf8_lossy(value.as_bytes()).trim().to_string(),
        );
    }
    normalized
}

/// TLS backends report certificate failures as opaque errors, so the whole
/// chain is searched, including payloads boxed inside `io::Error`.
fn is_certificate_error(err: &reqwest::Error) -> bool {
    let mut source = Some(err as &(dyn StdError + 'static));
    while let Some(e) = source {
        if mentions_certificate(e) {
            return true;
        }
        if let Some(inner) = e.downcast_ref::<io::Error>().and_then(io::Error::get_ref) {
            if mentions_certificate(inner) {
                return true;
            }
        }
        source = e.source();
    }
    false
}

fn mentions_certificate(err: &(dyn StdError + 'static)) -> bool {
    err.to_string().to_ascii_lowercase().contains("certificate")
}

pub(crate) fn trace_request(request: &PreparedRequest) {
    let body = request.body().map(String::from_utf8_lossy).unwrap_or_default();
    tracing::debug!(
        target: TRACE_TARGET,
        method = %request.method(),
        url = %request.url(),
        headers = ?request.headers(),
        body = %body,
        "sending request"
    );
}

pub(crate) fn trace_response(response: &HttpResponse) {
    let body = String::from_utf8_lossy(response.body());
    tracing::debug!(
        target: TRACE_TARGET,
        status = response.status().as_u16(),
        url = response.url(),
        headers = ?response.headers(),
        body = %body,
        "received response"
    );
}
