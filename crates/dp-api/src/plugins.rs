//! Typed plugin configurations served under `/api/plugins/{name}/`.

use dp_core::EffectiveColorMode;
use dp_core::PortalError;
use dp_core::PortalResult;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;

pub const THEME_PLUGIN: &str = "theme";
pub const FOOTER_PLUGIN: &str = "footer";
pub const ORAMA_PLUGIN: &str = "orama";

/// A plugin blob: `{active, name, ...fields}`.
///
/// Inactive plugins may carry null fields, so `fields` is only decoded for
/// active ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig<F> {
    pub name: String,
    pub active: bool,
    pub fields: Option<F>,
}

impl<F> PluginConfig<F> {
    pub fn active_fields(&self) -> Option<&F> {
        self.fields.as_ref().filter(|_| self.active)
    }
}

#[derive(Deserialize)]
struct RawPlugin {
    active: bool,
    name: String,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

pub fn decode_plugin<F: DeserializeOwned>(value: Value) -> PortalResult<PluginConfig<F>> {
    let raw: RawPlugin = serde_json::from_value(value).map_err(|error| PortalError::Decode {
        message: format!("plugin config: {error}"),
    })?;
    let fields = if raw.active {
        let decoded = serde_json::from_value(Value::Object(raw.fields)).map_err(|error| {
            PortalError::Decode {
                message: format!("plugin `{}` fields: {error}", raw.name),
            }
        })?;
        Some(decoded)
    } else {
        None
    };

    Ok(PluginConfig {
        name: raw.name,
        active: raw.active,
        fields,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSettings {
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub logo_url_small: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePlugin {
    #[serde(default)]
    pub light: ThemeSettings,
    #[serde(default)]
    pub dark: ThemeSettings,
}

impl ThemePlugin {
    pub fn settings(&self, mode: EffectiveColorMode) -> &ThemeSettings {
        match mode {
            EffectiveColorMode::Light => &self.light,
            EffectiveColorMode::Dark => &self.dark,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FooterIcon {
    Email,
    Support,
    Public,
    Github,
    Bugs,
    Home,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FooterLinkTarget {
    #[default]
    #[serde(rename = "_blank")]
    Blank,
    #[serde(rename = "_self")]
    SelfFrame,
    #[serde(rename = "_parent")]
    Parent,
    #[serde(rename = "_top")]
    Top,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterLink {
    pub title: String,
    pub icon: FooterIcon,
    pub href: String,
    #[serde(default)]
    pub target: FooterLinkTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterLinkGroup {
    pub title: String,
    pub icon: FooterIcon,
    #[serde(default)]
    pub links: Vec<FooterLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterPlugin {
    #[serde(default)]
    pub links: Vec<FooterLinkGroup>,
    #[serde(default)]
    pub copyright: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OramaDictionary {
    pub search_placeholder: Option<String>,
    pub chat_placeholder: Option<String>,
    pub no_results_found: Option<String>,
    pub no_results_found_for: Option<String>,
    pub suggestions: Option<Vec<String>>,
    pub see_all: Option<String>,
    pub add_more: Option<String>,
    pub clear_chat: Option<String>,
    pub error_message: Option<String>,
    pub disclaimer: Option<String>,
    pub start_your_search: Option<String>,
    pub init_error_search: Option<String>,
    pub init_error_chat: Option<String>,
    pub chat_button_label: Option<String>,
    pub search_button_label: Option<String>,
}

/// Hosted search configuration. The portal only carries it to the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OramaPlugin {
    pub endpoint: String,
    pub api_key: String,
    #[serde(default)]
    pub disable_chat: bool,
    #[serde(default)]
    pub facet_property: Option<String>,
    #[serde(default)]
    pub dictionary: Option<OramaDictionary>,
}

#[cfg(test)]
mod tests {
    use super::FooterIcon;
    use super::FooterLinkTarget;
    use super::FooterPlugin;
    use super::OramaPlugin;
    use super::ThemePlugin;
    use super::decode_plugin;
    use dp_core::EffectiveColorMode;
    use serde_json::json;

    #[test]
    fn inactive_plugin_with_null_fields_decodes() {
        let config = decode_plugin::<ThemePlugin>(json!({
            "active": false,
            "name": "theme",
            "light": null,
            "dark": null
        }));
        let config = match config {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        assert!(!config.active);
        assert_eq!(config.active_fields(), None);
    }

    #[test]
    fn theme_settings_by_mode() {
        let config = decode_plugin::<ThemePlugin>(json!({
            "active": true,
            "name": "theme",
            "light": {"logo_url": "/light.svg"},
            "dark": {"logo_url": "/dark.svg", "logo_url_small": "/dark-small.svg"}
        }));
        let theme = match config {
            Ok(value) => value.fields.unwrap_or_default(),
            Err(error) => panic!("{error}"),
        };
        assert_eq!(
            theme.settings(EffectiveColorMode::Dark).logo_url_small.as_deref(),
            Some("/dark-small.svg")
        );
        assert_eq!(theme.settings(EffectiveColorMode::Light).logo_url_small, None);
    }

    #[test]
    fn footer_links_decode_icons_and_targets() {
        let config = decode_plugin::<FooterPlugin>(json!({
            "active": true,
            "name": "footer",
            "links": [{
                "title": "Community",
                "icon": "public",
                "links": [{"title": "Issues", "icon": "bugs", "href": "https://bugs.test", "target": "_self"}]
            }],
            "copyright": "ACME"
        }));
        let footer = match config {
            Ok(value) => value.fields.unwrap_or_default(),
            Err(error) => panic!("{error}"),
        };
        assert_eq!(footer.links[0].icon, FooterIcon::Public);
        assert_eq!(footer.links[0].links[0].target, FooterLinkTarget::SelfFrame);
        assert_eq!(footer.copyright.as_deref(), Some("ACME"));
    }

    #[test]
    fn active_plugin_with_bad_fields_fails() {
        let config = decode_plugin::<OramaPlugin>(json!({
            "active": true,
            "name": "orama",
            "endpoint": null
        }));
        assert!(matches!(config, Err(error) if error.code() == "api.decode_failed"));
    }
}
