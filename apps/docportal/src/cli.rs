//! Command-line arguments.

use crate::logging::LogConfig;
use crate::logging::LogFormat;
use clap::Parser;
use clap::ValueEnum;
use clap_verbosity_flag::InfoLevel;
use clap_verbosity_flag::Verbosity;
use dp_net::NetConfig;
use dp_net::TrustStoreMode;
use dp_portal::PortalConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "docportal",
    version,
    about = "Browse hosted documentation sets in a native window"
)]
pub struct Cli {
    /// Documentation server, e.g. `http://localhost:8080`.
    #[arg(long = "server-url", value_name = "URL")]
    pub server_url: Option<String>,

    /// Directory holding persisted preferences.
    #[arg(long = "storage-dir", value_name = "DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Keep preferences in memory only.
    #[arg(long)]
    pub ephemeral: bool,

    /// Portal path to open first, e.g. `/project/latest/`.
    #[arg(long, value_name = "PATH", default_value = "/")]
    pub open: String,

    /// Also trust the operating system's root certificates.
    #[arg(long = "trust-os-roots")]
    pub trust_os_roots: bool,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Log output format.
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl Cli {
    /// Command-line values take precedence over `config`.
    pub fn apply(&self, mut config: PortalConfig) -> PortalConfig {
        if let Some(url) = self.server_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                config.server_url = url.trim_end_matches('/').to_owned();
            }
        }
        if let Some(dir) = &self.storage_dir {
            config.storage_root = dir.clone();
        }
        if self.ephemeral {
            config.ephemeral_storage = true;
        }
        config
    }

    pub fn net_config(&self) -> NetConfig {
        NetConfig {
            trust_store_mode: if self.trust_os_roots {
                TrustStoreMode::WebPkiAndOs
            } else {
                TrustStoreMode::WebPkiOnly
            },
            ..NetConfig::default()
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level_filter: self.verbosity.tracing_level_filter(),
            use_env_filter: !self.verbosity.is_present(),
            format: match self.log_format {
                LogFormatArg::Pretty => LogFormat::Pretty,
                LogFormatArg::Compact => LogFormat::Compact,
                LogFormatArg::Json => LogFormat::Json,
            },
        }
    }

    /// Initial host path, always rooted.
    pub fn initial_path(&self) -> String {
        let path = self.open.trim();
        if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use crate::logging::LogFormat;
    use clap::Parser;
    use dp_net::TrustStoreMode;
    use dp_portal::PortalConfig;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Cli {
        match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn defaults_keep_config() {
        let cli = parse(&["docportal"]);
        let config = cli.apply(PortalConfig::default());
        assert_eq!(config, PortalConfig::default());
        assert_eq!(cli.initial_path(), "/");
        assert_eq!(cli.net_config().trust_store_mode, TrustStoreMode::WebPkiOnly);
    }

    #[test]
    fn flags_override_config() {
        let cli = parse(&[
            "docportal",
            "--server-url",
            "https://docs.acme.test/",
            "--storage-dir",
            "/tmp/dp",
            "--ephemeral",
            "--open",
            "proj/latest/",
            "--trust-os-roots",
            "--log-format",
            "json",
            "-v",
        ]);
        let config = cli.apply(PortalConfig::default());
        assert_eq!(config.server_url, "https://docs.acme.test");
        assert_eq!(config.storage_root, PathBuf::from("/tmp/dp"));
        assert!(config.ephemeral_storage);
        assert_eq!(cli.initial_path(), "/proj/latest/");
        assert_eq!(cli.net_config().trust_store_mode, TrustStoreMode::WebPkiAndOs);

        let log = cli.log_config();
        assert_eq!(log.format, LogFormat::Json);
        assert!(!log.use_env_filter);
    }
}
