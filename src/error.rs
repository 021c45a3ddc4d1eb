use http::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
pub type RetrievalResult<T> = std::result::Result<T, RetrievalError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("request failed : {0}")]
    Transport(#[source] reqwest::Error),
    #[error("TLS peer verification failed : {0}")]
    TlsVerification(#[source] reqwest::Error),
    #[error("token exchange failed : {0}")]
    AuthExchange(#[from] ExchangeError),
    #[error("no access token is set; exchange an authorization code first")]
    NotAuthenticated,
    #[error("could not retrieve {locator} for upload : {source}")]
    Retrieval {
        locator: String,
        #[source]
        source: RetrievalError,
    },
    #[error("invalid url : {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid header value : {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    #[error("invalid configuration : {0}")]
    Config(String),
}

#[derive(Error, Debug, Clone)]
pub enum ExchangeError {
    #[error("server rejected the authorization code: {0}")]
    Rejected(String),
    #[error("response has malformed format: not found {0} in {1}")]
    TokenKeyNotFound(&'static str, String),
    #[error("response is not a JSON object: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {0}")]
    Status(StatusCode),
}
