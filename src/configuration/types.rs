use serde::{Deserialize, Serialize};

/// What happens to bytes that follow an extracted JSON object in the same
/// accumulation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemainderPolicy {
    /// Clear the whole buffer after an extraction (at most one pending object
    /// per connection).
    #[default]
    Discard,
    /// Keep the bytes after the extracted span as the start of the next cycle.
    Retain,
}

/// Symbols the observer asks the instrumentation host to hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Library exporting the resolver entry point.
    pub resolve_module: Option<String>,
    /// Name-resolution entry point.
    pub resolve_symbol: String,
    /// Secure-transport write entry points, tried in order until one attaches.
    pub write_symbols: Vec<String>,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            resolve_module: Some(String::from("libc.so")),
            resolve_symbol: String::from("getaddrinfo"),
            write_symbols: vec![String::from("SSL_write"), String::from("SSL_write_ex")],
        }
    }
}
