use crate::LocalStorage;
use dp_core::COLOR_MODE_STORAGE_KEY;
use dp_core::ColorMode;
use dp_core::PortalResult;

/// The user's color-mode choice, persisted in the host partition.
#[derive(Debug, Clone)]
pub struct ColorModePreference {
    storage: LocalStorage,
}

impl ColorModePreference {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// Stored mode, or [`ColorMode::System`] when unset or unreadable.
    pub fn load(&self) -> ColorMode {
        match self.storage.get_item(COLOR_MODE_STORAGE_KEY) {
            Ok(Some(raw)) => ColorMode::parse(&raw).unwrap_or_default(),
            Ok(None) => ColorMode::default(),
            Err(error) => {
                tracing::warn!(code = error.code(), %error, "color mode preference unreadable");
                ColorMode::default()
            }
        }
    }

    pub fn store(&self, mode: ColorMode) -> PortalResult<()> {
        self.storage.set_item(COLOR_MODE_STORAGE_KEY, mode.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ColorModePreference;
    use crate::HOST_PARTITION;
    use crate::StorageManager;
    use dp_core::ColorMode;

    #[test]
    fn defaults_to_system_and_persists_choice() {
        let manager = StorageManager::ephemeral();
        let preference = ColorModePreference::new(manager.local_storage(HOST_PARTITION));
        assert_eq!(preference.load(), ColorMode::System);

        assert!(preference.store(ColorMode::Dark).is_ok());
        assert_eq!(preference.load(), ColorMode::Dark);

        assert!(
            manager
                .local_storage(HOST_PARTITION)
                .set_item("darkMode", "purple")
                .is_ok()
        );
        assert_eq!(preference.load(), ColorMode::System);
    }
}
