use crate::{RetrievalError, RetrievalResult};

/// Reads the bytes behind a file reference before it is uploaded.
pub trait ContentFetcher {
    fn fetch(&self, locator: &str) -> RetrievalResult<Vec<u8>>;
}

/// Fetches `http://` and `https://` locators with a single GET and reads
/// everything else from the local filesystem.
///
/// Remote fetches use a fresh reqwest client with its defaults. They do not
/// honor the `verify_peer` flag or the timeouts of [`crate::ClientConfig`];
/// supply your own [`ContentFetcher`] when those matter.
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher;

impl ContentFetcher for DefaultFetcher {
    fn fetch(&self, locator: &str) -> RetrievalResult<Vec<u8>> {
        if is_remote(locator) {
            let resp = reqwest::blocking::get(locator)?;
            if !resp.status().is_success() {
                return Err(RetrievalError::Status(resp.status()));
            }
            Ok(resp.bytes()?.to_vec())
        } else {
            Ok(std::fs::read(locator)?)
        }
    }
}

impl<T: ContentFetcher + ?Sized> ContentFetcher for &T {
    fn fetch(&self, locator: &str) -> RetrievalResult<Vec<u8>> {
        (**self).fetch(locator)
    }
}

pub(crate) fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}
