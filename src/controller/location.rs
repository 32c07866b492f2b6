use url::form_urlencoded;

/// Name of the URL parameter that carries a deep-linked search.
pub const QUERY_PARAM: &str = "q";

/// Extracts the first non-blank `q` parameter from a URL query string.
pub fn query_param(search: &str) -> Option<String> {
    let search = search.strip_prefix('?').unwrap_or(search);
    form_urlencoded::parse(search.as_bytes())
        .find(|(key, _)| key == QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
}
