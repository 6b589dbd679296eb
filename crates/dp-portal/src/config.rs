use dp_core::STATIC_PROJECTS_PREFIX;
use dp_api::listing::DEFAULT_RECENT_VERSIONS;
use std::path::PathBuf;

pub const ENV_SERVER_URL: &str = "DOCPORTAL_SERVER_URL";
pub const ENV_STORAGE_DIR: &str = "DOCPORTAL_STORAGE_DIR";
pub const ENV_EPHEMERAL: &str = "DOCPORTAL_EPHEMERAL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub server_url: String,
    pub static_prefix: String,
    pub error_countdown_secs: u32,
    pub storage_root: PathBuf,
    pub ephemeral_storage: bool,
    pub dropdown_recent_versions: usize,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_owned(),
            static_prefix: STATIC_PROJECTS_PREFIX.to_owned(),
            error_countdown_secs: 5,
            storage_root: PathBuf::from(".docportal"),
            ephemeral_storage: false,
            dropdown_recent_versions: DEFAULT_RECENT_VERSIONS,
        }
    }
}

impl PortalConfig {
    /// Defaults overridden by `DOCPORTAL_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|url| !url.trim().is_empty()) {
            self.server_url = url.trim().to_owned();
        }
        if let Some(dir) = lookup(ENV_STORAGE_DIR).filter(|dir| !dir.trim().is_empty()) {
            self.storage_root = PathBuf::from(dir.trim());
        }
        if let Some(flag) = lookup(ENV_EPHEMERAL) {
            self.ephemeral_storage = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::ENV_EPHEMERAL;
    use super::ENV_SERVER_URL;
    use super::PortalConfig;

    #[test]
    fn defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.server_url, "http://localhost:8080");
        assert_eq!(config.static_prefix, "/static/projects/");
        assert_eq!(config.error_countdown_secs, 5);
        assert_eq!(config.dropdown_recent_versions, 5);
    }

    #[test]
    fn environment_overrides() {
        let config = PortalConfig::default().with_env(|key| match key {
            ENV_SERVER_URL => Some(" https://docs.acme.test ".to_owned()),
            ENV_EPHEMERAL => Some("TRUE".to_owned()),
            _ => None,
        });
        assert_eq!(config.server_url, "https://docs.acme.test");
        assert!(config.ephemeral_storage);
    }
}
