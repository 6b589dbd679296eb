//! Error screen with a recovery action and optional auto-recovery.

use dp_core::PortalError;

pub const GO_BACK_LABEL: &str = "Go back";
pub const RELOAD_PROJECTS_LABEL: &str = "Reload Projects";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    message: String,
    action_label: String,
    remaining_secs: Option<u32>,
    fired: bool,
}

impl ErrorView {
    /// Error that returns to the previous page after `countdown_secs`.
    pub fn go_back(error: &PortalError, countdown_secs: u32) -> Self {
        Self {
            message: error.user_message(),
            action_label: GO_BACK_LABEL.to_owned(),
            remaining_secs: Some(countdown_secs),
            fired: false,
        }
    }

    /// Error whose action only runs when the user asks for it.
    pub fn manual(message: &str, action_label: &str) -> Self {
        Self {
            message: message.to_owned(),
            action_label: action_label.to_owned(),
            remaining_secs: None,
            fired: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn action_label(&self) -> &str {
        &self.action_label
    }

    pub fn remaining_secs(&self) -> Option<u32> {
        self.remaining_secs
    }

    pub fn description(&self) -> Option<String> {
        let remaining = self.remaining_secs?;
        let plural = if remaining == 1 { "" } else { "s" };
        Some(format!(
            "Returning to previous page in {remaining} second{plural}..."
        ))
    }

    /// Advances the countdown by one second. Returns `true` once, when the
    /// action is due.
    pub fn tick(&mut self) -> bool {
        let Some(remaining) = self.remaining_secs.as_mut() else {
            return false;
        };
        if self.fired {
            return false;
        }
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.fired = true;
            return true;
        }
        false
    }

    /// The user pressed the action button. Returns `false` when the action
    /// already ran.
    pub fn trigger(&mut self) -> bool {
        if self.fired && self.remaining_secs.is_some() {
            return false;
        }
        self.fired = self.remaining_secs.is_some();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorView;
    use dp_core::PortalError;

    #[test]
    fn counts_down_and_fires_once() {
        let error = PortalError::VersionNotFound {
            message: "Version 9.9 of p not found".to_owned(),
        };
        let mut view = ErrorView::go_back(&error, 2);
        assert_eq!(view.message(), "Version 9.9 of p not found");
        assert_eq!(
            view.description().as_deref(),
            Some("Returning to previous page in 2 seconds...")
        );
        assert!(!view.tick());
        assert_eq!(
            view.description().as_deref(),
            Some("Returning to previous page in 1 second...")
        );
        assert!(view.tick());
        assert!(!view.tick());
        assert!(!view.trigger());
    }

    #[test]
    fn manual_trigger_stops_countdown() {
        let mut view = ErrorView::go_back(&PortalError::PageNotFound, 5);
        assert!(view.trigger());
        assert!(!view.tick());
    }

    #[test]
    fn manual_views_have_no_countdown() {
        let mut view = ErrorView::manual("No projects found", "Reload Projects");
        assert_eq!(view.description(), None);
        assert!(!view.tick());
        assert!(view.trigger());
        assert!(view.trigger());
    }
}
