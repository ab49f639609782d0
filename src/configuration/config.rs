use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of bytes of each write that reach the accumulator.
pub const DEFAULT_PREVIEW_CAP: usize = 4096;
/// Default number of characters echoed in the per-write log line.
pub const DEFAULT_LOG_PREVIEW_CHARS: usize = 256;

/// Runtime configuration of an observer session.
///
/// Loaded from a TOML file; every field has a default so an empty file (or no
/// file at all) is a valid configuration.
///
/// # Fields Overview
///
/// - `preview_cap`: bytes of each write kept for reconstruction, the rest is
///   dropped from observation
/// - `log_preview_chars`: characters of each write echoed to the log
/// - `remainder_policy`: whether bytes after an extracted object survive into
///   the next accumulation cycle
/// - `hooks`: entry points requested from the instrumentation host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preview_cap: usize,
    pub log_preview_chars: usize,
    pub remainder_policy: RemainderPolicy,
    pub hooks: HookConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preview_cap: DEFAULT_PREVIEW_CAP,
            log_preview_chars: DEFAULT_LOG_PREVIEW_CHARS,
            remainder_policy: RemainderPolicy::default(),
            hooks: HookConfig::default(),
        }
    }
}

impl Config {
    /// Reads and validates a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Reading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview_cap == 0 {
            return Err(ConfigError::NotInRange(
                "preview_cap must be greater than 0".to_string(),
            ));
        }
        if self.hooks.write_symbols.is_empty() {
            return Err(ConfigError::NotInRange(
                "hooks.write_symbols must name at least one symbol".to_string(),
            ));
        }
        Ok(())
    }

    /// Applies command-line overrides on top of file values.
    pub fn apply_args(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        if let Some(cap) = args.preview_cap {
            self.preview_cap = cap;
        }
        if args.retain_remainder {
            self.remainder_policy = RemainderPolicy::Retain;
        }
        self.validate()
    }
}

/// Command-line interface of the `tlspeek` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "tlspeek")]
#[command(version)]
#[command(about = "Reconstructs JSON payloads from plaintext secure-transport writes")]
pub struct CliArgs {
    /// TOML configuration file
    ///
    /// # Command Line
    /// Use `--config <PATH>` or the `TLSPEEK_CONFIG` environment variable
    #[arg(long, env = "TLSPEEK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the per-write observation cap in bytes
    #[arg(long)]
    pub preview_cap: Option<usize>,

    /// Keep bytes that follow an extracted object for the next cycle
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub retain_remainder: bool,

    /// Also print every capture as a JSON line on standard output
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,

    /// JSON-lines event traces; `-` or nothing reads standard input
    pub events: Vec<PathBuf>,
}

impl CliArgs {
    /// Resolves the final configuration: file (or defaults) then flags.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_args(self)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_under_test(extra: &[&str]) -> Result<CliArgs, clap::Error> {
        let mut argv = vec!["tlspeek"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv)
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.preview_cap, 4096);
        assert_eq!(config.log_preview_chars, 256);
        assert_eq!(config.remainder_policy, RemainderPolicy::Discard);
        assert_eq!(config.hooks.write_symbols, vec!["SSL_write", "SSL_write_ex"]);
    }

    #[test]
    fn test_from_toml_str_overrides() {
        let text = r#"
preview_cap = 1024
remainder_policy = "retain"

[hooks]
write_symbols = ["SSL_write_ex"]
"#;
        let config = Config::from_toml_str(text).unwrap();
        assert_eq!(config.preview_cap, 1024);
        assert_eq!(config.remainder_policy, RemainderPolicy::Retain);
        assert_eq!(config.hooks.write_symbols, vec!["SSL_write_ex"]);
        assert_eq!(config.hooks.resolve_symbol, "getaddrinfo");
    }

    #[test]
    fn test_zero_cap_rejected() {
        let err = Config::from_toml_str("preview_cap = 0").unwrap_err();
        assert!(matches!(err, ConfigError::NotInRange(_)));
    }

    #[test]
    fn test_bad_toml_rejected() {
        let err = Config::from_toml_str("preview_cap = \"big\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_preview_chars = 32").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.log_preview_chars, 32);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(Path::new("/nonexistent/tlspeek.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_args_override_file() {
        let args =
            args_under_test(&["--preview-cap", "512", "--retain-remainder", "trace.jsonl"])
                .unwrap_or_else(|e| panic!("{}", e));
        let config = args.load_config().unwrap();
        assert_eq!(config.preview_cap, 512);
        assert_eq!(config.remainder_policy, RemainderPolicy::Retain);
        assert_eq!(args.events, vec![PathBuf::from("trace.jsonl")]);
    }

    #[test]
    fn test_args_zero_cap_rejected() {
        let args = args_under_test(&["--preview-cap", "0"]).unwrap();
        assert!(args.load_config().is_err());
    }
}
