//! Rewrites anchors of a freshly loaded frame document.

use dp_core::DocLocation;
use dp_dom::ClickHandler;
use dp_dom::Document;
use dp_dom::NodeId;
use dp_uri::SanitizeResult;
use dp_uri::Sanitizer;
use dp_uri::resolve_against_base;
use std::rc::Rc;

const NEW_TAB_REL: &str = "noopener noreferrer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    /// Same project; navigation goes through the host router.
    Internal,
    /// Another project on this portal; opens in a new tab.
    CrossProject,
    /// Another origin or an href the sanitizer could not classify.
    External,
}

/// What happened to one anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAnchorRewrite {
    pub anchor: NodeId,
    pub original_href: String,
    pub rewritten_href: String,
    pub target: LinkTarget,
    pub handler_attached: bool,
}

/// Classifies every anchor present in `document` and rewrites it.
///
/// Same-project anchors get an absolute canonical href and a click handler
/// that cancels the frame navigation and reports the location to
/// `on_internal_navigate` instead. Everything else opens in a new tab.
/// Anchors with an empty href are left alone. Handlers live in the
/// element's `onclick` slot, so running this twice on one document leaves
/// one handler per anchor.
pub fn intercept(
    document: &mut Document,
    sanitizer: &Sanitizer,
    current_project: &str,
    current_version: &str,
    on_internal_navigate: Rc<dyn Fn(DocLocation)>,
) -> Vec<FrameAnchorRewrite> {
    let base = document.base_uri();
    let mut rewrites = Vec::new();

    for anchor in document.elements_by_tag_name("a") {
        let Some(original_href) = document
            .get_attribute(anchor, "href")
            .filter(|href| !href.trim().is_empty())
            .map(ToOwned::to_owned)
        else {
            continue;
        };

        let resolved = resolve_against_base(base.as_deref(), &original_href);
        let classified =
            sanitizer.sanitize(&resolved, Some(current_project), Some(current_version));

        let rewrite = match classified {
            Ok(SanitizeResult::Internal {
                location,
                canonical_href,
            }) => {
                let absolute = sanitizer
                    .host()
                    .join(&canonical_href)
                    .map(|url| url.to_string())
                    .unwrap_or(canonical_href);
                document.set_attribute(anchor, "href", &absolute);

                if location.project_name() != current_project {
                    open_in_new_tab(document, anchor);
                    rewrite(anchor, original_href, absolute, LinkTarget::CrossProject, false)
                } else if opens_new_tab(document, anchor) {
                    rewrite(anchor, original_href, absolute, LinkTarget::Internal, false)
                } else {
                    let navigate = Rc::clone(&on_internal_navigate);
                    document.set_onclick(
                        anchor,
                        Some(ClickHandler::new(move |event| {
                            event.prevent_default();
                            navigate(location.clone());
                        })),
                    );
                    rewrite(anchor, original_href, absolute, LinkTarget::Internal, true)
                }
            }
            Ok(SanitizeResult::External { href }) => {
                open_in_new_tab(document, anchor);
                rewrite(anchor, original_href, href, LinkTarget::External, false)
            }
            Err(error) => {
                tracing::debug!(href = original_href.as_str(), error = %error, "anchor left unrewritten");
                open_in_new_tab(document, anchor);
                let href = original_href.clone();
                rewrite(anchor, original_href, href, LinkTarget::External, false)
            }
        };

        tracing::trace!(
            href = rewrite.original_href.as_str(),
            rewritten = rewrite.rewritten_href.as_str(),
            target = ?rewrite.target,
            "anchor intercepted"
        );
        rewrites.push(rewrite);
    }

    tracing::debug!(
        anchors = rewrites.len(),
        handlers = rewrites.iter().filter(|r| r.handler_attached).count(),
        project = current_project,
        version = current_version,
        "frame anchors intercepted"
    );
    rewrites
}

fn rewrite(
    anchor: NodeId,
    original_href: String,
    rewritten_href: String,
    target: LinkTarget,
    handler_attached: bool,
) -> FrameAnchorRewrite {
    FrameAnchorRewrite {
        anchor,
        original_href,
        rewritten_href,
        target,
        handler_attached,
    }
}

fn opens_new_tab(document: &Document, anchor: NodeId) -> bool {
    document
        .get_attribute(anchor, "target")
        .is_some_and(|target| target.eq_ignore_ascii_case("_blank"))
}

fn open_in_new_tab(document: &mut Document, anchor: NodeId) {
    document.set_attribute(anchor, "target", "_blank");
    document.set_attribute(anchor, "rel", NEW_TAB_REL);
    document.set_onclick(anchor, None);
}
