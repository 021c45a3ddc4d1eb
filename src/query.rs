use std::borrow::Cow;

use url::form_urlencoded::Serializer;

use crate::Params;

/// Encode key/value pairs as `application/x-www-form-urlencoded`, keeping
/// the given order.
pub fn encode<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    Serializer::new(String::new()).extend_pairs(pairs).finish()
}

/// Encode a parameter mapping in insertion order.
///
/// File references are written in their raw `@locator` form; callers that
/// need the file content go through [`crate::multipart::encode`] instead.
pub fn encode_params(params: &Params) -> String {
    let raw: Vec<(&str, Cow<'_, str>)> = params.iter().map(|(k, v)| (k, v.to_raw())).collect();
    encode(raw.iter().map(|(k, v)| (*k, v.as_ref())))
}
