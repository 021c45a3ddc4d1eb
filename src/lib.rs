/*!
weibo-oauth2: a blocking OAuth2 client for the Weibo open platform, on top of
[reqwest](https://crates.io/crates/reqwest).

# Overview

This library walks an application through the OAuth2 authorization code flow
and then calls the REST API with the obtained token. Requests are built
by hand so that the encoded bodies are deterministic: query strings keep the
order parameters were given in, multipart bodies list their parts sorted by
name, and image uploads are read from a path or URL given as `@<locator>`.

# How to use

## Basic usecase 1 - Acquiring an access token

```no_run
use std::io;
use weibo_oauth2::{ClientConfig, OAuth2Client};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::new("[CLIENT_ID]", "[CLIENT_SECRET]", "https://example.com/callback");
    let mut client = OAuth2Client::new(config)?;

    // step 1: send the user to the authorization page
    println!("please access to: {}", client.authorize_url("code", Some("xyz"), None));

    // step 2: the redirect carries ?code=...
    println!("input code: ");
    let mut user_input = String::new();
    io::stdin().read_line(&mut user_input)?;

    // step 3: exchange the code for a token
    let token = client.exchange_code(user_input.trim())?;
    println!("your token is: {}", token.access_token);
    Ok(())
}
```

## Basic usecase 2 - Publishing a status with a picture

```no_run
use weibo_oauth2::{ClientConfig, OAuth2Client, Token};

fn main() -> Result<(), weibo_oauth2::Error> {
    let config = ClientConfig::from_env()?.remote_ip("203.0.113.9");
    let mut client = OAuth2Client::new(config)?;
    client.set_token(Token::new("[ACCESS_TOKEN]"));

    // `@` marks a file reference; the image is uploaded as multipart
    let resp = client.publish(
        "Hello, Weibo! http://example.com",
        Some("@/tmp/cat.png"),
        Some("203.0.113.9"),
    )?;
    println!("{:?}", resp);
    Ok(())
}
```
*/
mod client;
mod config;
mod error;
mod fetch;
pub mod multipart;
mod params;
pub mod query;
mod request;
mod response;
mod token;
mod transport;

// exposed to external program
pub use client::OAuth2Client;
pub use config::{ClientConfig, Deployment, Endpoints, DEFAULT_REMOTE_IP};
pub use error::{
    Error, ExchangeError, ExchangeResult, Result, RetrievalError, RetrievalResult,
};
pub use fetch::{ContentFetcher, DefaultFetcher};
pub use multipart::MultipartBody;
pub use params::{ParamValue, Params};
pub use request::{PreparedRequest, RequestBuilder, RequestSpec};
pub use response::{decode, Decoded, HttpResponse};
pub use token::Token;
pub use transport::{ReqwestTransport, Transport};

// exposed constant variables
/// Represents `access_token`.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Represents `client_id`.
pub const CLIENT_ID_KEY: &str = "client_id";
/// Represents `client_secret`.
pub const CLIENT_SECRET_KEY: &str = "client_secret";
/// Represents `code`.
pub const CODE_KEY: &str = "code";
/// Represents `display`.
pub const DISPLAY_KEY: &str = "display";
/// Represents `grant_type`.
pub const GRANT_TYPE_KEY: &str = "grant_type";
/// Represents `redirect_uri`.
pub const REDIRECT_URI_KEY: &str = "redirect_uri";
/// Represents `response_type`.
pub const RESPONSE_TYPE_KEY: &str = "response_type";
/// Represents `state`.
pub const STATE_KEY: &str = "state";
/// Marks a parameter value as a file to upload, e.g. `@/tmp/cat.png`.
pub const FILE_REF_PREFIX: char = '@';

// crate-private constant variables
pub(crate) const AUTHORIZATION_SCHEME: &str = "OAuth2";
pub(crate) const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";
pub(crate) const BINARY_PARAM_KEYS: &[&str] = &["pic", "image"];
pub(crate) const UID_KEY: &str = "uid";
pub(crate) const STATUS_KEY: &str = "status";
pub(crate) const PIC_KEY: &str = "pic";
pub(crate) const RIP_KEY: &str = "rip";
