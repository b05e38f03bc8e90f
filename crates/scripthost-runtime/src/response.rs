//! Buffered response handle.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use scripthost_protocols::ScriptError;
use serde::Serialize;
use tracing::debug;

const DEFAULT_REDIRECT_STATUS: u16 = 302;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl FromStr for SameSite {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lax" => Ok(SameSite::Lax),
            "strict" => Ok(SameSite::Strict),
            "none" => Ok(SameSite::None),
            other => Err(ScriptError::validation(format!("invalid sameSite: {}", other))),
        }
    }
}

/// Options for [`ScriptResponse::set_cookie`].
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    /// Positive: lifetime in seconds. Negative: delete now. Zero: session cookie.
    pub max_age: i64,
    /// Unix timestamp.
    pub expires: Option<i64>,
    /// Defaults to `/`.
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

/// Everything needed to write the HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseParts {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug)]
struct ResponseState {
    status: u16,
    headers: Vec<(String, String)>,
    body: BytesMut,
    ended: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: BytesMut::new(),
            ended: false,
        }
    }
}

impl ResponseState {
    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// True when writes are still accepted.
    fn writable(&self, op: &str) -> bool {
        if self.ended {
            debug!("response.{} ignored after end()", op);
        }
        !self.ended
    }
}

/// The `response` binding.
///
/// Output is buffered and flushed by the host when the invocation ends.
/// After [`ScriptResponse::end`] further mutations are ignored.
#[derive(Debug, Clone, Default)]
pub struct ScriptResponse {
    state: Arc<Mutex<ResponseState>>,
}

impl ScriptResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header(&self, name: &str, value: &str) {
        let mut state = self.state.lock();
        if state.writable("setHeader") {
            state.set_header(name, value);
        }
    }

    pub fn get_header(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    pub fn remove_header(&self, name: &str) {
        let mut state = self.state.lock();
        if state.writable("removeHeader") {
            state.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        }
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    pub fn set_status(&self, status: u16) {
        let mut state = self.state.lock();
        if state.writable("setStatus") {
            state.status = status;
        }
    }

    /// Alias of [`ScriptResponse::set_status`].
    pub fn status_code(&self, status: u16) {
        self.set_status(status)
    }

    pub fn status(&self) -> u16 {
        self.state.lock().status
    }

    pub fn write(&self, data: impl AsRef<[u8]>) {
        let mut state = self.state.lock();
        if state.writable("write") {
            state.body.extend_from_slice(data.as_ref());
        }
    }

    pub fn write_head(&self, status: u16, headers: &[(&str, &str)]) {
        let mut state = self.state.lock();
        if state.writable("writeHead") {
            for (name, value) in headers {
                state.set_header(name, value);
            }
            state.status = status;
        }
    }

    /// Finish the response, optionally writing a last chunk.
    pub fn end(&self, data: Option<&str>) {
        let mut state = self.state.lock();
        if state.writable("end") {
            if let Some(data) = data {
                state.body.extend_from_slice(data.as_bytes());
            }
            state.ended = true;
        }
    }

    pub fn is_ended(&self) -> bool {
        self.state.lock().ended
    }

    /// Redirect to `location` (302 unless `status` is given) and end.
    pub fn redirect(&self, location: &str, status: Option<u16>) {
        let mut state = self.state.lock();
        if state.writable("redirect") {
            state.set_header("Location", location);
            state.status = status.unwrap_or(DEFAULT_REDIRECT_STATUS);
            state.ended = true;
        }
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), ScriptError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| ScriptError::validation(format!("response.json: {}", e)))?;
        let mut state = self.state.lock();
        if state.writable("json") {
            state.set_header("Content-Type", "application/json");
            state.body.extend_from_slice(&body);
        }
        Ok(())
    }

    /// Write an already-encoded JSON document.
    pub fn json_raw(&self, json: &str) {
        let mut state = self.state.lock();
        if state.writable("json") {
            state.set_header("Content-Type", "application/json");
            state.body.extend_from_slice(json.as_bytes());
        }
    }

    pub fn set_cookie(&self, name: &str, value: &str, options: &CookieOptions) -> Result<(), ScriptError> {
        if name.is_empty() || name.contains(['=', ';', ' ']) {
            return Err(ScriptError::validation(format!("invalid cookie name: {:?}", name)));
        }
        let cookie = format_cookie(name, value, options)?;
        let mut state = self.state.lock();
        if state.writable("setCookie") {
            state.headers.push(("Set-Cookie".to_string(), cookie));
        }
        Ok(())
    }

    /// Current buffered state.
    pub fn parts(&self) -> ResponseParts {
        let state = self.state.lock();
        ResponseParts {
            status: state.status,
            headers: state.headers.clone(),
            body: Bytes::copy_from_slice(&state.body),
        }
    }
}

fn format_cookie(name: &str, value: &str, options: &CookieOptions) -> Result<String, ScriptError> {
    let mut cookie = format!("{}={}", name, value);
    let path = options.path.as_deref().unwrap_or("/");
    let _ = write!(cookie, "; Path={}", path);
    if let Some(domain) = &options.domain {
        let _ = write!(cookie, "; Domain={}", domain);
    }
    if let Some(expires) = options.expires {
        let at = chrono::DateTime::from_timestamp(expires, 0)
            .ok_or_else(|| ScriptError::validation(format!("invalid cookie expires: {}", expires)))?;
        let _ = write!(cookie, "; Expires={}", at.format("%a, %d %b %Y %H:%M:%S GMT"));
    }
    if options.max_age > 0 {
        let _ = write!(cookie, "; Max-Age={}", options.max_age);
    } else if options.max_age < 0 {
        cookie.push_str("; Max-Age=0");
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    match options.same_site {
        Some(SameSite::Lax) => cookie.push_str("; SameSite=Lax"),
        Some(SameSite::Strict) => cookie.push_str("; SameSite=Strict"),
        Some(SameSite::None) => cookie.push_str("; SameSite=None"),
        None => {}
    }
    Ok(cookie)
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
