#![cfg(any(feature = "default-tls", feature = "rustls-tls"))]

use std::{
    io::{Read, Write},
    net::TcpListener,
    thread,
};

use native_tls::{Identity, TlsAcceptor};
use weibo_oauth2::{
    ClientConfig, DefaultFetcher, Error, RequestBuilder, RequestSpec, ReqwestTransport, Transport,
};

const CERT_PEM: &[u8] = include_bytes!("fixtures/self_signed.pem");
const KEY_PEM: &[u8] = include_bytes!("fixtures/self_signed.key");

/// Serves one HTTPS connection with a self-signed certificate and returns the port.
fn self_signed_server() -> u16 {
    let identity = Identity::from_pkcs8(CERT_PEM, KEY_PEM).unwrap();
    let acceptor = TlsAcceptor::new(identity).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let stream = match listener.incoming().next() {
            Some(Ok(stream)) => stream,
            _ => return,
        };
        // a verifying client hangs up during the handshake
        let mut tls = match acceptor.accept(stream) {
            Ok(tls) => tls,
            Err(_) => return,
        };
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match tls.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = tls.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
        );
        let _ = tls.flush();
    });
    port
}

fn get(config: &ClientConfig, port: u16) -> weibo_oauth2::Result<weibo_oauth2::HttpResponse> {
    let transport = ReqwestTransport::new(config)?;
    let spec = RequestSpec::get(format!("https://127.0.0.1:{}/ping", port));
    let request = RequestBuilder::new(config).build(spec, &DefaultFetcher)?;
    transport.send(request)
}

#[test]
fn self_signed_certificate_is_rejected_when_verifying() {
    let port = self_signed_server();
    let config = ClientConfig::new("id", "secret", "cb");
    match get(&config, port) {
        Err(Error::TlsVerification(_)) => {}
        other => panic!("expected a TLS verification error, got {:?}", other),
    }
}

#[test]
fn self_signed_certificate_is_accepted_without_verification() {
    let port = self_signed_server();
    let config = ClientConfig::new("id", "secret", "cb").verify_peer(false);
    let resp = get(&config, port).unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.body(), b"ok");
}
