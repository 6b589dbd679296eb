use crate::config::PortalConfig;
use dp_api::PortalApi;
use dp_core::ColorMode;
use dp_core::EffectiveColorMode;
use dp_core::PortalResult;
use dp_frame::DocumentLoader;
use dp_storage::ColorModePreference;
use dp_storage::HOST_PARTITION;
use dp_storage::StorageConfig;
use dp_storage::StorageManager;
use dp_uri::Sanitizer;
use std::sync::Arc;

/// Services and settings shared by every page of one portal session.
///
/// Passed explicitly to whoever needs it, so several sessions can coexist
/// in one process.
#[derive(Clone)]
pub struct PortalContext {
    config: PortalConfig,
    api: Arc<dyn PortalApi>,
    loader: Arc<dyn DocumentLoader>,
    storage: StorageManager,
    sanitizer: Sanitizer,
    preference: ColorModePreference,
    color_mode: ColorMode,
    system_prefers_dark: bool,
}

impl PortalContext {
    pub fn new(
        config: PortalConfig,
        api: Arc<dyn PortalApi>,
        loader: Arc<dyn DocumentLoader>,
    ) -> PortalResult<Self> {
        let storage = if config.ephemeral_storage {
            StorageManager::ephemeral()
        } else {
            StorageManager::new(StorageConfig::default())
                .with_persistent_root(config.storage_root.clone())
        };
        Self::with_storage(config, api, loader, storage)
    }

    pub fn with_storage(
        config: PortalConfig,
        api: Arc<dyn PortalApi>,
        loader: Arc<dyn DocumentLoader>,
        storage: StorageManager,
    ) -> PortalResult<Self> {
        let sanitizer = Sanitizer::with_static_prefix(&config.server_url, &config.static_prefix)?;
        let preference = ColorModePreference::new(storage.local_storage(HOST_PARTITION));
        let color_mode = preference.load();

        Ok(Self {
            config,
            api,
            loader,
            storage,
            sanitizer,
            preference,
            color_mode,
            system_prefers_dark: false,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn api(&self) -> &Arc<dyn PortalApi> {
        &self.api
    }

    pub fn loader(&self) -> &Arc<dyn DocumentLoader> {
        &self.loader
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn effective_color_mode(&self) -> EffectiveColorMode {
        self.color_mode.resolve(self.system_prefers_dark)
    }

    /// Persists the preference; storage failures are logged and the mode
    /// still applies for this session.
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.color_mode = mode;
        if let Err(error) = self.preference.store(mode) {
            tracing::warn!(error = %error, "failed to persist color mode");
        }
    }

    pub fn set_system_prefers_dark(&mut self, prefers_dark: bool) {
        self.system_prefers_dark = prefers_dark;
    }
}

impl std::fmt::Debug for PortalContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalContext")
            .field("config", &self.config)
            .field("color_mode", &self.color_mode)
            .field("system_prefers_dark", &self.system_prefers_dark)
            .finish_non_exhaustive()
    }
}
