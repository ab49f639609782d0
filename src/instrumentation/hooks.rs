use std::collections::HashSet;

use log::{info, warn};
use serde::Serialize;

use crate::configuration::HookConfig;

/// Whatever loads the observer into a process and can look up its exports.
pub trait InstrumentationHost: Send + Sync {
    /// Whether `symbol` is exported by `module` (any loaded module when `None`).
    fn find_export(&self, module: Option<&str>, symbol: &str) -> bool;
}

/// Which hooks ended up attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachReport {
    pub resolve_hook: Option<String>,
    pub write_hook: Option<String>,
    /// Symbols that were looked up and not found, in lookup order.
    pub missing: Vec<String>,
}

impl AttachReport {
    /// True when either hook is missing. The observer keeps running, it just
    /// sees fewer events.
    pub fn is_degraded(&self) -> bool {
        self.resolve_hook.is_none() || self.write_hook.is_none()
    }

    pub fn write_hooked(&self, symbol: &str) -> bool {
        self.write_hook.as_deref() == Some(symbol)
    }
}

/// Looks up the resolve hook and the first available write symbol.
///
/// Missing symbols are reported once each and never fail the attach.
pub fn attach_hooks(host: &dyn InstrumentationHost, hooks: &HookConfig) -> AttachReport {
    let mut report = AttachReport::default();
    let module = hooks.resolve_module.as_deref();

    if host.find_export(module, &hooks.resolve_symbol) {
        info!(
            "Hooked {} in {}",
            hooks.resolve_symbol,
            module.unwrap_or("(any module)")
        );
        report.resolve_hook = Some(hooks.resolve_symbol.clone());
    } else {
        warn!(
            "{} not found in {}, host attribution limited to request headers",
            hooks.resolve_symbol,
            module.unwrap_or("(any module)")
        );
        report.missing.push(hooks.resolve_symbol.clone());
    }

    for symbol in &hooks.write_symbols {
        if host.find_export(None, symbol) {
            info!("Hooked {}", symbol);
            report.write_hook = Some(symbol.clone());
            break;
        }
        warn!("{} not found", symbol);
        report.missing.push(symbol.clone());
    }

    let summary = hooks
        .write_symbols
        .iter()
        .map(|symbol| format!("{}={}", symbol, report.write_hooked(symbol)))
        .collect::<Vec<_>>()
        .join(" ");
    info!("{}", summary);

    report
}

/// Host for replayed traces: every configured symbol counts as present.
#[derive(Debug, Clone, Default)]
pub struct ReplayHost {
    exports: HashSet<String>,
}

impl ReplayHost {
    pub fn new(hooks: &HookConfig) -> Self {
        let exports = std::iter::once(hooks.resolve_symbol.clone())
            .chain(hooks.write_symbols.iter().cloned())
            .collect();
        Self { exports }
    }
}

impl InstrumentationHost for ReplayHost {
    fn find_export(&self, _module: Option<&str>, symbol: &str) -> bool {
        self.exports.contains(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeHost(&'static [&'static str]);

    impl InstrumentationHost for FakeHost {
        fn find_export(&self, _module: Option<&str>, symbol: &str) -> bool {
            self.0.iter().any(|s| *s == symbol)
        }
    }

    #[test]
    fn prefers_first_write_symbol() {
        let report = attach_hooks(
            &FakeHost(&["getaddrinfo", "SSL_write", "SSL_write_ex"]),
            &HookConfig::default(),
        );
        assert_eq!(report.write_hook.as_deref(), Some("SSL_write"));
        assert_eq!(report.resolve_hook.as_deref(), Some("getaddrinfo"));
        assert!(report.missing.is_empty());
        assert!(!report.is_degraded());
    }

    #[test]
    fn falls_back_to_write_ex() {
        let report = attach_hooks(
            &FakeHost(&["getaddrinfo", "SSL_write_ex"]),
            &HookConfig::default(),
        );
        assert!(report.write_hooked("SSL_write_ex"));
        assert!(!report.write_hooked("SSL_write"));
        assert_eq!(report.missing, vec!["SSL_write"]);
        assert!(!report.is_degraded());
    }

    #[test]
    fn missing_hooks_degrade_without_failing() {
        let report = attach_hooks(&FakeHost(&[]), &HookConfig::default());
        assert!(report.is_degraded());
        assert_eq!(report.write_hook, None);
        assert_eq!(
            report.missing,
            vec!["getaddrinfo", "SSL_write", "SSL_write_ex"]
        );
    }

    #[test]
    fn replay_host_exports_configured_symbols() {
        let hooks = HookConfig::default();
        let host = ReplayHost::new(&hooks);
        assert!(host.find_export(Some("libc.so"), "getaddrinfo"));
        assert!(host.find_export(None, "SSL_write"));
        assert!(!host.find_export(None, "SSL_read"));
        assert!(!attach_hooks(&host, &hooks).is_degraded());
    }
}
