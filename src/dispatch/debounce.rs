/// Suppresses re-sending an unchanged label.
#[derive(Clone, Debug, Default)]
pub struct LabelDebouncer {
    last_sent: Option<String>,
}

impl LabelDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `label` should be dispatched, and records it as the
    /// last sent label. A repeat of the last sent label returns false and
    /// leaves state untouched.
    pub fn emit(&mut self, label: &str) -> bool {
        if self.last_sent.as_deref() == Some(label) {
            return false;
        }
        self.last_sent = Some(label.to_string());
        true
    }

    pub fn last_sent(&self) -> Option<&str> {
        self.last_sent.as_deref()
    }
}
