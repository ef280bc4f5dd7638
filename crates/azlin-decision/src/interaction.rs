/// Every user prompt goes through this capability so the decision flow
/// stays fully deterministic in tests (no real stdin read in the
/// non-interactive path). Two concrete implementations, no third-party
/// mocking needed.
pub trait InteractionHandler: Send + Sync {
    fn confirm(&self, message: &str, default: bool) -> bool;

    /// Presents `choices` (label, description) and returns the index
    /// chosen, or `None` if the user cancels.
    fn choose(&self, message: &str, choices: &[&str], default_index: usize) -> Option<usize>;
}

pub struct InteractiveHandler;

impl InteractionHandler for InteractiveHandler {
    fn confirm(&self, message: &str, default: bool) -> bool {
        inquire::Confirm::new(message)
            .with_default(default)
            .prompt()
            .unwrap_or(default)
    }

    fn choose(&self, message: &str, choices: &[&str], default_index: usize) -> Option<usize> {
        let options: Vec<String> = choices.iter().map(|s| s.to_string()).collect();
        let starting = options.get(default_index).cloned().unwrap_or_default();
        let selected = inquire::Select::new(message, options.clone())
            .with_starting_cursor(choices.iter().position(|c| *c == starting).unwrap_or(0))
            .prompt()
            .ok()?;
        choices.iter().position(|c| *c == selected)
    }
}

/// Returns configured defaults immediately; never blocks. Driven by
/// `AZLIN_NONINTERACTIVE=1`.
pub struct NonInteractiveHandler;

impl InteractionHandler for NonInteractiveHandler {
    fn confirm(&self, _message: &str, default: bool) -> bool {
        default
    }

    fn choose(&self, _message: &str, _choices: &[&str], default_index: usize) -> Option<usize> {
        Some(default_index)
    }
}

pub fn from_env() -> Box<dyn InteractionHandler> {
    if std::env::var("AZLIN_NONINTERACTIVE").as_deref() == Ok("1") {
        Box::new(NonInteractiveHandler)
    } else {
        Box::new(InteractiveHandler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_returns_defaults() {
        let h = NonInteractiveHandler;
        assert!(h.confirm("delete everything?", true));
        assert!(!NonInteractiveHandler.confirm("delete everything?", false));
        assert_eq!(h.choose("pick", &["a", "b", "c"], 1), Some(1));
    }
}
