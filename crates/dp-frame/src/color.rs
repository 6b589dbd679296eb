//! Propagates the portal color mode into the embedded document.

use crate::Frame;
use dp_core::COLOR_MODE_STORAGE_KEY;
use dp_core::EffectiveColorMode;
use dp_dom::Document;

pub const XHTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// How a documentation theme marks dark mode on its root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeConvention {
    /// Doxygen output: exclusive `light-mode` / `dark-mode` classes.
    Doxygen,
    /// Utility-class themes (Sphinx Awesome, Tailwind): a single `dark` class.
    UtilityClass,
}

impl ThemeConvention {
    /// Doxygen pages declare the XHTML namespace on `<html>`.
    pub fn detect(document: &Document) -> Self {
        let xmlns = document
            .document_element()
            .and_then(|root| document.get_attribute(root, "xmlns"));
        match xmlns {
            Some(XHTML_NAMESPACE) => Self::Doxygen,
            _ => Self::UtilityClass,
        }
    }

    pub fn apply(self, document: &mut Document, mode: EffectiveColorMode) {
        let Some(root) = document.document_element() else {
            return;
        };
        match self {
            Self::Doxygen => {
                document.class_remove(root, &["light-mode", "dark-mode"]);
                let class = if mode.is_dark() { "dark-mode" } else { "light-mode" };
                document.class_add(root, &[class]);
            }
            Self::UtilityClass => {
                document.class_toggle(root, "dark", Some(mode.is_dark()));
            }
        }
    }
}

/// Writes `mode` into the frame's local storage and root classes.
///
/// Does nothing when the frame document is missing or cross-origin.
pub fn apply_color_mode(frame: &mut Frame, mode: EffectiveColorMode) -> Option<ThemeConvention> {
    let window = match frame.content_window_mut() {
        Ok(window) => window,
        Err(error) => {
            tracing::warn!(error = %error, "frame content not accessible; color mode not applied");
            return None;
        }
    };
    window.document().document_element()?;

    if let Err(error) = window
        .local_storage()
        .set_item(COLOR_MODE_STORAGE_KEY, mode.as_str())
    {
        tracing::warn!(error = %error, "failed to mirror color mode into frame storage");
    }

    let convention = ThemeConvention::detect(window.document());
    convention.apply(window.document_mut(), mode);
    tracing::debug!(?convention, mode = mode.as_str(), "applied frame color mode");
    Some(convention)
}

#[cfg(test)]
mod tests {
    use super::ThemeConvention;
    use super::apply_color_mode;
    use crate::Frame;
    use crate::StaticSiteLoader;
    use dp_core::COLOR_MODE_STORAGE_KEY;
    use dp_core::EffectiveColorMode;
    use dp_html::HtmlParser;
    use dp_storage::StorageManager;
    use std::io;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            match self.0.lock() {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(error) => panic!("{error}"),
            }
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            match self.0.lock() {
                Ok(mut bytes) => bytes.extend_from_slice(buf),
                Err(error) => panic!("{error}"),
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn doxygen_pages_get_exclusive_mode_classes() {
        let mut doc = HtmlParser.parse(
            r#"<html xmlns="http://www.w3.org/1999/xhtml" class="light-mode"><body></body></html>"#,
        );
        let convention = ThemeConvention::detect(&doc);
        assert_eq!(convention, ThemeConvention::Doxygen);

        convention.apply(&mut doc, EffectiveColorMode::Dark);
        let Some(root) = doc.document_element() else {
            panic!("missing root");
        };
        assert!(doc.class_contains(root, "dark-mode"));
        assert!(!doc.class_contains(root, "light-mode"));
        assert!(!doc.class_contains(root, "dark"));
    }

    #[test]
    fn other_pages_toggle_dark_class_only() {
        let mut doc = HtmlParser.parse(r#"<html class="scroll-smooth"><body></body></html>"#);
        let convention = ThemeConvention::detect(&doc);
        assert_eq!(convention, ThemeConvention::UtilityClass);
        let Some(root) = doc.document_element() else {
            panic!("missing root");
        };

        convention.apply(&mut doc, EffectiveColorMode::Dark);
        assert_eq!(doc.class_list(root), vec!["scroll-smooth", "dark"]);
        convention.apply(&mut doc, EffectiveColorMode::Light);
        assert_eq!(doc.class_list(root), vec!["scroll-smooth"]);
        assert!(!doc.class_contains(root, "light-mode"));
    }

    #[test]
    fn frame_storage_receives_mode() {
        let site = StaticSiteLoader::new().with_page("/static/projects/p/1.0/index.html", "<p>x</p>");
        let storage = StorageManager::ephemeral();
        let mut frame = match Frame::new("http://localhost:8080", storage) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };

        assert_eq!(apply_color_mode(&mut frame, EffectiveColorMode::Dark), None);

        assert!(frame.set_src("/static/projects/p/1.0/index.html").is_ok());
        frame.pump(&site);
        assert_eq!(
            apply_color_mode(&mut frame, EffectiveColorMode::Dark),
            Some(ThemeConvention::UtilityClass)
        );
        let stored = match frame.content_window() {
            Ok(window) => window.local_storage().get_item(COLOR_MODE_STORAGE_KEY),
            Err(error) => panic!("{error}"),
        };
        assert_eq!(stored, Ok(Some("dark".to_owned())));
    }

    #[test]
    fn unavailable_frame_is_reported_at_warn() {
        let mut frame = match Frame::new("http://localhost:8080", StorageManager::ephemeral()) {
            Ok(value) => value,
            Err(error) => panic!("{error}"),
        };
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();

        let applied = tracing::subscriber::with_default(subscriber, || {
            apply_color_mode(&mut frame, EffectiveColorMode::Light)
        });

        assert_eq!(applied, None);
        let text = logs.text();
        assert!(text.contains("WARN"), "{text}");
        assert!(text.contains("frame content not accessible"), "{text}");
    }
}
