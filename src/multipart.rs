use uuid::Uuid;

use crate::{ContentFetcher, Error, ParamValue, Params, Result};

const BOUNDARY_PREFIX: &str = "------------------";
const CRLF: &[u8] = b"\r\n";
const FILE_CONTENT_TYPE: &str = "image/unknown";

/// An encoded `multipart/form-data` body and the boundary delimiting it.
///
/// The boundary is random per body. It is not checked against the payload,
/// so a file that happens to contain `--<boundary>` would corrupt the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Encode `params` as `multipart/form-data`.
///
/// Parts are written in byte-wise key order. File references are read
/// through `fetcher`; a failed read aborts the whole body.
pub fn encode<F>(params: &Params, fetcher: &F) -> Result<MultipartBody>
where
    F: ContentFetcher + ?Sized,
{
    let boundary = format!("{}{}", BOUNDARY_PREFIX, Uuid::new_v4().simple());
    let delimiter = format!("--{}", boundary);

    let mut sorted: Vec<(&str, &ParamValue)> = params.iter().collect();
    sorted.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut body = Vec::new();
    for (key, value) in sorted {
        body.extend_from_slice(delimiter.as_bytes());
        body.extend_from_slice(CRLF);
        match value {
            ParamValue::FileRef(locator) => {
                let content = fetcher.fetch(locator).map_err(|source| Error::Retrieval {
                    locator: locator.clone(),
                    source,
                })?;
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        key,
                        file_name(locator)
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(
                    format!("Content-Type: {}\r\n\r\n", FILE_CONTENT_TYPE).as_bytes(),
                );
                body.extend_from_slice(&content);
            }
            ParamValue::Text(text) => {
                body.extend_from_slice(
                    format!("content-disposition: form-data; name=\"{}\"\r\n\r\n", key)
                        .as_bytes(),
                );
                body.extend_from_slice(text.as_bytes());
            }
        }
        body.extend_from_slice(CRLF);
    }
    body.extend_from_slice(delimiter.as_bytes());
    body.extend_from_slice(b"--");

    Ok(MultipartBody { boundary, body })
}

/// Last path segment of `locator`, without any query string.
fn file_name(locator: &str) -> &str {
    let path = locator.split('?').next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}
