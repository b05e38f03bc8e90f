//! Read-only view of the inbound request.

use std::collections::BTreeMap;

use bytes::Bytes;

/// The `request` binding.
///
/// Header lookups are case-insensitive; when a header or query parameter
/// repeats, single-value accessors return the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct ScriptRequest {
    method: String,
    url: String,
    raw_path: String,
    path: String,
    host: String,
    remote_addr: String,
    proto: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl ScriptRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            method: method.into(),
            url: path.clone(),
            raw_path: path.clone(),
            path,
            proto: "HTTP/1.1".to_string(),
            ..Default::default()
        }
    }

    /// Full request target as received.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Path before the script route prefix was stripped.
    pub fn with_raw_path(mut self, raw_path: impl Into<String>) -> Self {
        self.raw_path = raw_path.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
        self.remote_addr = remote_addr.into();
        self
    }

    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = proto.into();
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Path relative to the script route.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn remote_addr(&self) -> &str {
        &self.remote_addr
    }

    pub fn proto(&self) -> &str {
        &self.proto
    }

    /// Query parameters, first value per key.
    pub fn query(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (key, value) in &self.query {
            map.entry(key.clone()).or_insert_with(|| value.clone());
        }
        map
    }

    pub fn get_query(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Headers keyed by their received name, first value per name.
    pub fn headers(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for (name, value) in &self.headers {
            map.entry(name.clone()).or_insert_with(|| value.clone());
        }
        map
    }

    /// Header value, or `None` when absent or empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_header(name).filter(|v| !v.is_empty())
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Lower-cased header names.
    pub fn header_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.headers.iter().map(|(n, _)| n.to_ascii_lowercase()).collect();
        names.dedup();
        names
    }

    /// Header names as received.
    pub fn raw_header_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.headers.iter().map(|(n, _)| n.clone()).collect();
        names.dedup();
        names
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_websocket_upgrade(&self) -> bool {
        self.get_header("upgrade")
            .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
    }

    pub fn read_body(&self) -> Bytes {
        self.body.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ScriptRequest {
        ScriptRequest::new("GET", "/chat")
            .with_raw_path("/acme/site/chat/chat")
            .with_query("name", "alice")
            .with_query("name", "bob")
            .with_header("X-Token", "abc")
            .with_header("X-Empty", "")
            .with_header("Upgrade", "websocket")
            .with_body("payload")
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = request();
        assert_eq!(req.get_header("x-token"), Some("abc"));
        assert!(req.has_header("X-TOKEN"));
        assert!(!req.has_header("x-empty"));
        assert_eq!(req.get("x-empty"), None);
        assert_eq!(req.get_header("x-empty"), Some(""));
    }

    #[test]
    fn test_header_names() {
        let req = request();
        assert_eq!(req.header_names(), vec!["x-token", "x-empty", "upgrade"]);
        assert_eq!(req.raw_header_names(), vec!["X-Token", "X-Empty", "Upgrade"]);
        assert_eq!(req.headers().get("X-Token").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_query_first_value_wins() {
        let req = request();
        assert_eq!(req.get_query("name"), Some("alice"));
        assert_eq!(req.query().get("name").map(String::as_str), Some("alice"));
        assert_eq!(req.get_query("missing"), None);
    }

    #[test]
    fn test_paths_and_body() {
        let req = request();
        assert_eq!(req.path(), "/chat");
        assert_eq!(req.raw_path(), "/acme/site/chat/chat");
        assert_eq!(&req.read_body()[..], b"payload");
        assert!(req.is_websocket_upgrade());
    }
}
