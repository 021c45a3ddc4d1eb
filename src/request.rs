use http::{
    header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    HeaderMap, Method,
};
use url::Url;

use crate::{
    multipart, query, ClientConfig, ContentFetcher, Deployment, Endpoints, Params, Result,
    AUTHORIZATION_SCHEME,
};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// What the caller asked for: target, method and parameters.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: String,
    params: Params,
    multipart: bool,
}

impl RequestSpec {
    pub fn new<U: Into<String>>(method: Method, url: U) -> Self {
        RequestSpec {
            method,
            url: url.into(),
            params: Params::new(),
            multipart: false,
        }
    }

    pub fn get<U: Into<String>>(url: U) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post<U: Into<String>>(url: U) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn params(self, params: Params) -> Self {
        RequestSpec { params, ..self }
    }

    /// Force a `multipart/form-data` body even without file parameters.
    ///
    /// Ignored for `GET`.
    pub fn multipart(self, multipart: bool) -> Self {
        RequestSpec { multipart, ..self }
    }
}

/// A fully encoded request, ready for a [`crate::Transport`].
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl PreparedRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn into_parts(self) -> (Method, Url, HeaderMap, Option<Vec<u8>>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Turns a [`RequestSpec`] into a [`PreparedRequest`].
///
/// `GET` parameters go into the query string. Any other method gets a body:
/// multipart when forced or when a file is attached, url-encoded otherwise.
#[derive(Debug, Clone)]
pub struct RequestBuilder<'a> {
    endpoints: &'a Endpoints,
    deployment: Deployment,
    remote_ip: &'a str,
    token: Option<&'a str>,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a ClientConfig) -> Self {
        RequestBuilder {
            endpoints: config.get_endpoints(),
            deployment: config.get_deployment(),
            remote_ip: config.get_remote_ip(),
            token: None,
        }
    }

    /// Attach `Authorization: OAuth2 <token>` to built requests.
    pub fn token(self, token: Option<&'a str>) -> Self {
        RequestBuilder { token, ..self }
    }

    /// Expand a relative API path to `{api_host}{path}.{format}`.
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!(
                "{}{}.{}",
                self.endpoints.api_host, url, self.endpoints.format
            )
        }
    }

    pub fn build<F>(&self, spec: RequestSpec, fetcher: &F) -> Result<PreparedRequest>
    where
        F: ContentFetcher + ?Sized,
    {
        let RequestSpec {
            method,
            url,
            params,
            multipart: force_multipart,
        } = spec;
        let url = self.resolve_url(&url);
        let mut headers = HeaderMap::new();

        let (url, body) = if method == Method::GET {
            let url = if params.is_empty() {
                url
            } else {
                append_query(&url, &query::encode_params(&params))
            };
            (Url::parse(&url)?, None)
        } else {
            // validate before touching any file
            let url = Url::parse(&url)?;
            if force_multipart || params.has_file_ref() {
                let encoded = multipart::encode(&params, fetcher)?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_str(&encoded.content_type())?);
                (url, Some(encoded.into_body()))
            } else {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_URLENCODED));
                (url, Some(query::encode_params(&params).into_bytes()))
            }
        };

        if let Some(token) = self.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("{} {}", AUTHORIZATION_SCHEME, token))?,
            );
        }
        headers.insert(
            self.deployment.remote_ip_header(),
            HeaderValue::from_str(self.remote_ip)?,
        );

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body,
        })
    }
}

/// Append an encoded query to `url`, after `?` or `&` as appropriate.
pub(crate) fn append_query(url: &str, query: &str) -> String {
    match url.find('?') {
        None => format!("{}?{}", url, query),
        Some(i) if i + 1 == url.len() || url.ends_with('&') => format!("{}{}", url, query),
        Some(_) => format!("{}&{}", url, query),
    }
}
