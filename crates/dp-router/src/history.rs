use crate::HostRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Push,
    Replace,
    Pop,
}

/// Session history of the host shell.
#[derive(Debug, Clone)]
pub struct HostHistory {
    entries: Vec<String>,
    index: usize,
    pushed: u64,
    last_action: Option<HistoryAction>,
}

impl HostHistory {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: vec![initial.to_owned()],
            index: 0,
            pushed: 0,
            last_action: None,
        }
    }

    pub fn current(&self) -> &str {
        self.entries
            .get(self.index)
            .map(String::as_str)
            .unwrap_or("/")
    }

    pub fn current_route(&self) -> HostRoute {
        HostRoute::parse(self.current())
    }

    /// Adds an entry after the current one, dropping any forward entries.
    pub fn push(&mut self, path: &str) {
        self.entries.truncate(self.index.saturating_add(1));
        self.entries.push(path.to_owned());
        self.index = self.entries.len().saturating_sub(1);
        self.pushed = self.pushed.saturating_add(1);
        self.last_action = Some(HistoryAction::Push);
        tracing::debug!(path, "host history push");
    }

    pub fn replace(&mut self, path: &str) {
        if let Some(entry) = self.entries.get_mut(self.index) {
            *entry = path.to_owned();
        }
        self.last_action = Some(HistoryAction::Replace);
        tracing::debug!(path, "host history replace");
    }

    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.last_action = Some(HistoryAction::Pop);
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.index.saturating_add(1) >= self.entries.len() {
            return false;
        }
        self.index += 1;
        self.last_action = Some(HistoryAction::Pop);
        true
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index.saturating_add(1) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total pushes over the lifetime of the history; never decreases.
    pub fn pushed_entries(&self) -> u64 {
        self.pushed
    }

    pub fn last_action(&self) -> Option<HistoryAction> {
        self.last_action
    }
}

#[cfg(test)]
mod tests {
    use super::HistoryAction;
    use super::HostHistory;

    #[test]
    fn push_back_forward() {
        let mut history = HostHistory::new("/");
        history.push("/p/1.0/");
        history.push("/p/1.0/a.html");
        assert!(history.back());
        assert_eq!(history.current(), "/p/1.0/");
        assert!(history.can_go_forward());
        assert!(history.forward());
        assert_eq!(history.current(), "/p/1.0/a.html");
        assert!(!history.can_go_forward());
        assert!(!history.forward());
        assert_eq!(history.pushed_entries(), 2);
    }

    #[test]
    fn push_after_back_drops_forward_entries() {
        let mut history = HostHistory::new("/");
        history.push("/a");
        history.push("/b");
        assert!(history.back());
        history.push("/c");
        assert_eq!(history.len(), 3);
        assert!(!history.forward());
    }

    #[test]
    fn replace_keeps_length() {
        let mut history = HostHistory::new("/p/latest/");
        history.replace("/p/2.0/");
        assert_eq!(history.len(), 1);
        assert_eq!(history.current(), "/p/2.0/");
        assert_eq!(history.pushed_entries(), 0);
        assert_eq!(history.last_action(), Some(HistoryAction::Replace));
        assert!(!history.back());
    }
}
