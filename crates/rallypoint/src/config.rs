//! Client configuration.

use std::time::Duration;

use rallypoint_protocol::WireFormat;
use serde::{Deserialize, Serialize};

/// Everything needed to open a connection, apart from the session token.
///
/// Deserializable so applications can load it from their own config files;
/// every field is optional there and falls back to [`Default`].
///
/// ```rust
/// use rallypoint::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(r#"{"host":"game.example.com","ssl":true}"#).unwrap();
/// assert_eq!(config.port, 7350);
/// assert_eq!(config.url("abc"), "wss://game.example.com:7350/ws?token=abc&format=protobuf");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server host name or IP address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Use `wss://` instead of `ws://`.
    pub ssl: bool,
    /// Interval between keep-alive pings, in milliseconds.
    ///
    /// Default: 2000.
    pub keep_alive_ms: u64,
    /// Upper bound on how long a request waits for its reply, in
    /// milliseconds. `None` waits until the reply arrives or the connection
    /// closes.
    ///
    /// Default: `None`.
    pub request_timeout_ms: Option<u64>,
    /// Envelope encoding, announced to the server in the connect URL.
    pub format: WireFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7350,
            ssl: false,
            keep_alive_ms: 2_000,
            request_timeout_ms: None,
            format: WireFormat::default(),
        }
    }
}

impl ClientConfig {
    /// Smallest keep-alive interval accepted.
    pub const MIN_KEEP_ALIVE_MS: u64 = 100;

    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// Called by the builder before connecting. Rules:
    /// - `keep_alive_ms` raised to at least [`Self::MIN_KEEP_ALIVE_MS`].
    /// - `request_timeout_ms` of `Some(0)` treated as `None`.
    pub fn validated(mut self) -> Self {
        if self.keep_alive_ms < Self::MIN_KEEP_ALIVE_MS {
            tracing::warn!(
                keep_alive_ms = self.keep_alive_ms,
                min = Self::MIN_KEEP_ALIVE_MS,
                "keep_alive_ms below minimum, raising"
            );
            self.keep_alive_ms = Self::MIN_KEEP_ALIVE_MS;
        }
        if self.request_timeout_ms == Some(0) {
            self.request_timeout_ms = None;
        }
        self
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// The socket URL for `token`:
    /// `ws[s]://host:port/ws?token=<token>&format=<format>`.
    pub fn url(&self, token: &str) -> String {
        let scheme = if self.ssl { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}/ws?token={}&format={}",
            self.host,
            self.port,
            encode_query_value(token),
            self.format
        )
    }
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
