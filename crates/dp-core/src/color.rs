use std::fmt;

/// User-selected color preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ColorMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ColorMode {
    pub const ALL: [Self; 3] = [Self::Light, Self::System, Self::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
            Self::System => "System",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Resolves `System` against the operating system preference.
    pub fn resolve(self, system_prefers_dark: bool) -> EffectiveColorMode {
        match self {
            Self::Light => EffectiveColorMode::Light,
            Self::Dark => EffectiveColorMode::Dark,
            Self::System if system_prefers_dark => EffectiveColorMode::Dark,
            Self::System => EffectiveColorMode::Light,
        }
    }
}

/// Color mode actually applied to the shell and the embedded document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EffectiveColorMode {
    #[default]
    Light,
    Dark,
}

impl EffectiveColorMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }
}

impl fmt::Display for EffectiveColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
