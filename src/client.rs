use http::Method;

use crate::{
    query, request::append_query, token::read_token, transport, ClientConfig, ContentFetcher,
    Decoded, DefaultFetcher, Error, HttpResponse, Params, RequestBuilder, RequestSpec,
    ReqwestTransport, Result, Token, Transport, ACCESS_TOKEN_KEY, CLIENT_ID_KEY,
    CLIENT_SECRET_KEY, CODE_KEY, DISPLAY_KEY, GRANT_TYPE_AUTHORIZATION_CODE, GRANT_TYPE_KEY,
    PIC_KEY, REDIRECT_URI_KEY, RESPONSE_TYPE_KEY, RIP_KEY, STATE_KEY, STATUS_KEY, UID_KEY,
};

/// Weibo OAuth2 client.
///
/// Starts without a token. A successful [`exchange_code`](Self::exchange_code)
/// stores the access token, which is then sent as
/// `Authorization: OAuth2 <token>` on every request.
///
/// Token changes need `&mut self`; share one client across threads only
/// behind your own lock, or use one client per session.
#[derive(Debug)]
pub struct OAuth2Client<TTransport = ReqwestTransport, TFetcher = DefaultFetcher> {
    config: ClientConfig,
    transport: TTransport,
    fetcher: TFetcher,
    token: Option<Token>,
}

impl OAuth2Client {
    /// Constructs a new `OAuth2Client` sending through reqwest.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(OAuth2Client::new_with_transport(config, transport))
    }
}

impl<TTransport> OAuth2Client<TTransport, DefaultFetcher>
where
    TTransport: Transport,
{
    /// Constructs a new `OAuth2Client` with specifying the transport.
    pub fn new_with_transport(config: ClientConfig, transport: TTransport) -> Self {
        OAuth2Client {
            config,
            transport,
            fetcher: DefaultFetcher,
            token: None,
        }
    }
}

impl<TTransport, TFetcher> OAuth2Client<TTransport, TFetcher>
where
    TTransport: Transport,
    TFetcher: ContentFetcher,
{
    /// Replace how file references are read for uploads.
    pub fn with_fetcher<T: ContentFetcher>(self, fetcher: T) -> OAuth2Client<TTransport, T> {
        OAuth2Client {
            config: self.config,
            transport: self.transport,
            fetcher,
            token: self.token,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Use a token obtained elsewhere, e.g. restored from storage.
    pub fn set_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    /// URL of the authorization page the user has to visit.
    ///
    /// Absent `state` and `display` are still sent, with empty values.
    pub fn authorize_url(
        &self,
        response_type: &str,
        state: Option<&str>,
        display: Option<&str>,
    ) -> String {
        let query = query::encode(vec![
            (CLIENT_ID_KEY, self.config.client_id()),
            (REDIRECT_URI_KEY, self.config.redirect_uri()),
            (RESPONSE_TYPE_KEY, response_type),
            (STATE_KEY, state.unwrap_or_default()),
            (DISPLAY_KEY, display.unwrap_or_default()),
        ]);
        append_query(&self.config.get_endpoints().authorize_url, &query)
    }

    /// Trade an authorization code for an access token and keep it.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AuthExchange`] when the server answers with an
    /// `error` or without `access_token`; the client stays unauthenticated.
    pub fn exchange_code(&mut self, code: &str) -> Result<Token> {
        let params = Params::new()
            .text(CODE_KEY, code)
            .text(CLIENT_ID_KEY, self.config.client_id())
            .text(REDIRECT_URI_KEY, self.config.redirect_uri())
            .text(CLIENT_SECRET_KEY, self.config.client_secret())
            .text(GRANT_TYPE_KEY, GRANT_TYPE_AUTHORIZATION_CODE);
        let url = self.config.get_endpoints().access_token_url.clone();
        let resp = self.request(Method::POST, &url, params, false)?;

        let token = read_token(resp.decode(true)).map_err(|e| {
            if self.config.is_debug() {
                tracing::debug!(target: "weibo_oauth2", error = %e, "token exchange rejected");
            }
            e
        })?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Send one request and return the undecoded response.
    ///
    /// The stored token is attached when there is one.
    pub fn request(
        &self,
        method: Method,
        url: &str,
        params: Params,
        multipart: bool,
    ) -> Result<HttpResponse> {
        let spec = RequestSpec::new(method, url)
            .params(params)
            .multipart(multipart);
        let request = RequestBuilder::new(&self.config)
            .token(self.token.as_ref().map(|t| t.access_token.as_str()))
            .build(spec, &self.fetcher)?;

        if self.config.is_debug() {
            transport::trace_request(&request);
        }
        let resp = self.transport.send(request)?;
        if self.config.is_debug() {
            transport::trace_response(&resp);
        }
        Ok(resp)
    }

    pub fn get(&self, url: &str, params: Params) -> Result<Decoded> {
        self.call(Method::GET, url, params, false)
    }

    pub fn post(&self, url: &str, params: Params) -> Result<Decoded> {
        self.call(Method::POST, url, params, false)
    }

    /// `POST` with a `multipart/form-data` body regardless of the parameters.
    pub fn post_multipart(&self, url: &str, params: Params) -> Result<Decoded> {
        self.call(Method::POST, url, params, true)
    }

    /// Like [`get`](Self::get) but requires a token.
    pub fn authenticated_get(&self, url: &str, params: Params) -> Result<Decoded> {
        self.require_token()?;
        self.get(url, params)
    }

    /// Like [`post`](Self::post) but requires a token.
    pub fn authenticated_post(&self, url: &str, params: Params) -> Result<Decoded> {
        self.require_token()?;
        self.post(url, params)
    }

    /// Profile of the user with id `uid`.
    pub fn user_info(&self, uid: &str) -> Result<Decoded> {
        let token = self.require_token()?;
        let params = Params::new()
            .text(UID_KEY, uid)
            .text(ACCESS_TOKEN_KEY, token.access_token.as_str());
        self.authenticated_get(&self.config.get_endpoints().user_info_url, params)
    }

    /// Publish a status.
    ///
    /// `pic` may be `@<path or url>` to upload an image, which turns the
    /// request into a multipart upload. `real_ip` is the end user's IP.
    pub fn publish(&self, status: &str, pic: Option<&str>, real_ip: Option<&str>) -> Result<Decoded> {
        let token = self.require_token()?;
        let mut params = Params::new()
            .text(ACCESS_TOKEN_KEY, token.access_token.as_str())
            .text(STATUS_KEY, status);
        if let Some(pic) = pic {
            params = params.raw(PIC_KEY, pic);
        }
        if let Some(ip) = real_ip {
            params = params.text(RIP_KEY, ip);
        }
        self.authenticated_post(&self.config.get_endpoints().share_url, params)
    }

    fn call(&self, method: Method, url: &str, params: Params, multipart: bool) -> Result<Decoded> {
        let resp = self.request(method, url, params, multipart)?;
        Ok(resp.decode(self.config.is_decode_json()))
    }

    fn require_token(&self) -> Result<&Token> {
        self.token.as_ref().ok_or(Error::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::BTreeMap};

    use http::StatusCode;
    use serde_json::json;

    use super::*;
    use crate::{Deployment, ExchangeError, PreparedRequest, RetrievalError, RetrievalResult};

    /// Answers with canned bodies and keeps every request it was given.
    #[derive(Default)]
    struct RecordingTransport {
        replies: RefCell<Vec<(u16, &'static str)>>,
        sent: RefCell<Vec<PreparedRequest>>,
    }

    impl RecordingTransport {
        fn replying(replies: Vec<(u16, &'static str)>) -> Self {
            RecordingTransport {
                replies: RefCell::new(replies),
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, request: PreparedRequest) -> Result<HttpResponse> {
            let (status, body) = self.replies.borrow_mut().remove(0);
            let url = request.url().to_string();
            self.sent.borrow_mut().push(request);
            Ok(HttpResponse::new(
                StatusCode::from_u16(status).unwrap(),
                BTreeMap::new(),
                body.as_bytes().to_vec(),
                url,
            ))
        }
    }

    struct PngFetcher;

    impl ContentFetcher for PngFetcher {
        fn fetch(&self, locator: &str) -> RetrievalResult<Vec<u8>> {
            let path = locator.split('?').next().unwrap_or(locator);
            if path.ends_with(".png") {
                Ok(vec![0x89, b'P', b'N', b'G'])
            } else {
                Err(RetrievalError::Io(std::io::ErrorKind::NotFound.into()))
            }
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("app-id", "app-secret", "https://example.com/cb")
    }

    fn header(req: &PreparedRequest, name: &str) -> Option<String> {
        req.headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[test]
    fn authorize_url_with_absent_display() {
        let client = OAuth2Client::new_with_transport(config(), RecordingTransport::default());
        let url = client.authorize_url("code", Some("s1"), None);
        assert_eq!(
            url,
            "https://api.weibo.com/oauth2/authorize?client_id=app-id\
             &redirect_uri=https%3A%2F%2Fexample.com%2Fcb&response_type=code&state=s1&display="
        );
        assert!(url.contains("response_type=code&state=s1&display="));
    }

    #[test]
    fn authorize_url_decodes_to_configuration() {
        let client = OAuth2Client::new_with_transport(config(), RecordingTransport::default());
        let url = client.authorize_url("token", None, Some("mobile"));
        let query = url.split('?').nth(1).unwrap();
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("client_id".to_string(), "app-id".to_string()),
                ("redirect_uri".to_string(), "https://example.com/cb".to_string()),
                ("response_type".to_string(), "token".to_string()),
                ("state".to_string(), String::new()),
                ("display".to_string(), "mobile".to_string()),
            ]
        );
    }

    #[test]
    fn exchange_code_stores_token() {
        let transport = RecordingTransport::replying(vec![(200, r#"{"access_token":"T1"}"#)]);
        let mut client = OAuth2Client::new_with_transport(config(), &transport);
        assert!(!client.is_authenticated());

        let token = client.exchange_code("C0DE").unwrap();
        assert_eq!(token.access_token, "T1");
        assert!(client.is_authenticated());
        assert_eq!(client.token(), Some(&token));

        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method(), &Method::POST);
        assert_eq!(
            sent[0].url().as_str(),
            "https://api.weibo.com/oauth2/access_token"
        );
        assert_eq!(
            sent[0].body(),
            Some(
                &b"code=C0DE&client_id=app-id&redirect_uri=https%3A%2F%2Fexample.com%2Fcb\
                   &client_secret=app-secret&grant_type=authorization_code"[..]
            )
        );
        assert_eq!(
            header(&sent[0], "content-type").as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        assert!(header(&sent[0], "authorization").is_none());
    }

    #[test]
    fn exchange_code_rejected() {
        let transport =
            RecordingTransport::replying(vec![(400, r#"{"error":"invalid_grant","error_code":21325}"#)]);
        let mut client = OAuth2Client::new_with_transport(config(), transport);
        let result = client.exchange_code("expired");
        if let Err(Error::AuthExchange(ExchangeError::Rejected(detail))) = result {
            assert_eq!(detail, "invalid_grant");
        } else {
            assert!(false)
        }
        assert!(!client.is_authenticated());
    }

    #[test]
    fn exchange_code_ignores_decode_flag() {
        let transport = RecordingTransport::replying(vec![(200, r#"{"access_token":"T1"}"#)]);
        let mut client =
            OAuth2Client::new_with_transport(config().decode_json(false), transport);
        assert_eq!(client.exchange_code("C").unwrap().access_token, "T1");
    }

    #[test]
    fn exchange_code_non_json() {
        let transport = RecordingTransport::replying(vec![(502, "<html>bad gateway</html>")]);
        let mut client = OAuth2Client::new_with_transport(config(), transport);
        assert!(matches!(
            client.exchange_code("C"),
            Err(Error::AuthExchange(ExchangeError::Malformed(_)))
        ));
        assert!(client.token().is_none());
    }

    #[test]
    fn failed_exchange_keeps_previous_token() {
        let transport = RecordingTransport::replying(vec![(400, r#"{"error":"invalid_grant"}"#)]);
        let mut client = OAuth2Client::new_with_transport(config(), transport);
        client.set_token(Token::new("OLD"));
        assert!(client.exchange_code("C").is_err());
        assert_eq!(client.token().unwrap().access_token, "OLD");
    }

    #[test]
    fn authenticated_calls_need_a_token() {
        let transport = RecordingTransport::default();
        let client = OAuth2Client::new_with_transport(config(), &transport);
        assert!(matches!(
            client.authenticated_get("users/show", Params::new()),
            Err(Error::NotAuthenticated)
        ));
        assert!(matches!(
            client.authenticated_post("statuses/share", Params::new()),
            Err(Error::NotAuthenticated)
        ));
        assert!(matches!(client.user_info("1"), Err(Error::NotAuthenticated)));
        assert!(matches!(
            client.publish("hi", None, None),
            Err(Error::NotAuthenticated)
        ));
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn authenticated_get_sends_token_header() {
        let transport = RecordingTransport::replying(vec![
            (200, r#"{"access_token":"T1"}"#),
            (200, r#"{"statuses":[]}"#),
        ]);
        let mut client = OAuth2Client::new_with_transport(config(), &transport);
        client.exchange_code("C").unwrap();

        let decoded = client
            .authenticated_get("statuses/home_timeline", Params::new().text("count", "5"))
            .unwrap();
        assert_eq!(decoded, Decoded::Json(json!({"statuses": []})));

        let sent = transport.sent.borrow();
        assert_eq!(
            sent[1].url().as_str(),
            "https://api.weibo.com/2/statuses/home_timeline.json?count=5"
        );
        assert_eq!(header(&sent[1], "authorization").as_deref(), Some("OAuth2 T1"));
    }

    #[test]
    fn user_info_query() {
        let transport = RecordingTransport::replying(vec![(200, r#"{"id":42,"screen_name":"x"}"#)]);
        let mut client = OAuth2Client::new_with_transport(config(), &transport);
        client.set_token(Token::new("T1"));
        let profile = client.user_info("42").unwrap();
        assert_eq!(profile.as_json().unwrap()["screen_name"], json!("x"));
        assert_eq!(
            transport.sent.borrow()[0].url().as_str(),
            "https://api.weibo.com/2/users/show.json?uid=42&access_token=T1"
        );
    }

    #[test]
    fn publish_text_is_urlencoded() {
        let transport = RecordingTransport::replying(vec![(200, r#"{"id":1}"#)]);
        let mut client = OAuth2Client::new_with_transport(config(), &transport);
        client.set_token(Token::new("T1"));
        client
            .publish("hello http://example.com", None, Some("1.2.3.4"))
            .unwrap();
        let sent = transport.sent.borrow();
        assert_eq!(
            sent[0].body(),
            Some(&b"access_token=T1&status=hello+http%3A%2F%2Fexample.com&rip=1.2.3.4"[..])
        );
    }

    #[test]
    fn publish_with_picture_is_multipart() {
        let transport = RecordingTransport::replying(vec![(200, r#"{"id":1}"#)]);
        let mut client =
            OAuth2Client::new_with_transport(config(), &transport).with_fetcher(PngFetcher);
        client.set_token(Token::new("T1"));
        client
            .publish("hi", Some("@http://img.example.com/a/cat.png?size=large"), Some("1.2.3.4"))
            .unwrap();

        let sent = transport.sent.borrow();
        let content_type = header(&sent[0], "content-type").unwrap();
        let boundary = content_type
            .strip_prefix("multipart/form-data; boundary=")
            .unwrap();
        let mut expected = format!(
            "--{b}\r\ncontent-disposition: form-data; name=\"access_token\"\r\n\r\nT1\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"pic\"; filename=\"cat.png\"\r\n\
             Content-Type: image/unknown\r\n\r\n",
            b = boundary
        )
        .into_bytes();
        expected.extend_from_slice(&[0x89, b'P', b'N', b'G']);
        expected.extend_from_slice(
            format!(
                "\r\n--{b}\r\ncontent-disposition: form-data; name=\"rip\"\r\n\r\n1.2.3.4\r\n\
                 --{b}\r\ncontent-disposition: form-data; name=\"status\"\r\n\r\nhi\r\n\
                 --{b}--",
                b = boundary
            )
            .as_bytes(),
        );
        assert_eq!(sent[0].body(), Some(&expected[..]));
        assert_eq!(header(&sent[0], "authorization").as_deref(), Some("OAuth2 T1"));
    }

    #[test]
    fn failed_picture_fetch_sends_nothing() {
        let transport = RecordingTransport::default();
        let mut client =
            OAuth2Client::new_with_transport(config(), &transport).with_fetcher(PngFetcher);
        client.set_token(Token::new("T1"));
        let result = client.publish("hi", Some("@/tmp/missing.gif"), None);
        if let Err(Error::Retrieval { locator, .. }) = result {
            assert_eq!(locator, "/tmp/missing.gif");
        } else {
            assert!(false)
        }
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn raw_body_when_decoding_disabled() {
        let transport = RecordingTransport::replying(vec![(200, r#"{"id":1}"#)]);
        let client = OAuth2Client::new_with_transport(config().decode_json(false), transport);
        let decoded = client.get("https://example.com/x", Params::new()).unwrap();
        assert_eq!(decoded, Decoded::Raw(r#"{"id":1}"#.to_string()));
    }

    #[test]
    fn non_success_status_is_returned() {
        let transport = RecordingTransport::replying(vec![(500, r#"{"error":"oops"}"#)]);
        let client = OAuth2Client::new_with_transport(config(), transport);
        let resp = client
            .request(Method::GET, "https://example.com/x", Params::new(), false)
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body(), br#"{"error":"oops"}"#);
    }

    #[test]
    fn post_multipart_forces_multipart() {
        let transport = RecordingTransport::replying(vec![(200, "{}")]);
        let client = OAuth2Client::new_with_transport(config(), &transport);
        client
            .post_multipart("https://example.com/x", Params::new().text("a", "1"))
            .unwrap();
        assert!(header(&transport.sent.borrow()[0], "content-type")
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn remote_ip_header_on_every_call() {
        let transport = RecordingTransport::replying(vec![(200, "{}"), (200, "{}")]);
        let client = OAuth2Client::new_with_transport(
            config()
                .remote_ip("203.0.113.9")
                .deployment(Deployment::Sandboxed),
            &transport,
        );
        client.get("https://example.com/x", Params::new()).unwrap();
        client.post("https://example.com/x", Params::new()).unwrap();
        for req in transport.sent.borrow().iter() {
            assert_eq!(header(req, "SaeRemoteIP").as_deref(), Some("203.0.113.9"));
        }
    }

    #[test]
    fn default_remote_ip_is_always_sent() {
        let transport = RecordingTransport::replying(vec![(200, "{}"), (200, "{}")]);
        let client = OAuth2Client::new_with_transport(config(), &transport);
        client.get("https://example.com/x", Params::new()).unwrap();
        client
            .post("https://example.com/x", Params::new().text("a", "1"))
            .unwrap();
        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 2);
        for req in sent.iter() {
            assert_eq!(header(req, "API-RemoteIP").as_deref(), Some("127.0.0.1"));
        }
    }

    #[test]
    fn debug_trace_does_not_change_results() {
        let transport = RecordingTransport::replying(vec![(200, r#"{"a":1}"#)]);
        let client = OAuth2Client::new_with_transport(config().debug(true), transport);
        let decoded = client.get("https://example.com/x", Params::new()).unwrap();
        assert_eq!(decoded, Decoded::Json(json!({"a": 1})));
    }
}
