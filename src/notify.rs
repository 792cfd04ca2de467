//! Transient success/error banner.

use colored::Colorize;
use std::time::{Duration, Instant};

/// How long a notice stays up unless replaced
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
    Info,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
    shown_at: Instant,
}

impl Notice {
    /// Single-line banner for the terminal
    pub fn banner(&self) -> String {
        let line = format!(" {} ", self.text);
        match self.level {
            Level::Success => line.black().on_green().to_string(),
            Level::Error => line.white().on_red().bold().to_string(),
            Level::Info => line.black().on_cyan().to_string(),
        }
    }
}

/// Holds at most one notice; a newer one replaces it and it expires on its own.
#[derive(Debug)]
pub struct Notifier {
    current: Option<Notice>,
    dismiss_after: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_AFTER)
    }
}

impl Notifier {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            current: None,
            dismiss_after,
        }
    }

    pub fn show(&mut self, level: Level, text: impl Into<String>) -> &Notice {
        self.show_at(level, text, Instant::now())
    }

    pub fn show_at(&mut self, level: Level, text: impl Into<String>, now: Instant) -> &Notice {
        self.current.insert(Notice {
            level,
            text: text.into(),
            shown_at: now,
        })
    }

    /// The visible notice, dropping it first if it has expired
    pub fn active(&mut self) -> Option<&Notice> {
        self.active_at(Instant::now())
    }

    pub fn active_at(&mut self, now: Instant) -> Option<&Notice> {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.shown_at) >= self.dismiss_after);
        if expired {
            self.current = None;
        }
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_notice_replaces_previous() {
        let mut notifier = Notifier::default();
        let t0 = Instant::now();
        notifier.show_at(Level::Success, "Book added successfully", t0);
        notifier.show_at(Level::Error, "Book not found", t0);

        let notice = notifier.active_at(t0).unwrap();
        assert_eq!(notice.level, Level::Error);
        assert_eq!(notice.text, "Book not found");
    }

    #[test]
    fn test_notice_expires_after_delay() {
        let mut notifier = Notifier::default();
        let t0 = Instant::now();
        notifier.show_at(Level::Info, "Saved", t0);

        assert!(notifier.active_at(t0 + Duration::from_millis(4_999)).is_some());
        assert!(notifier.active_at(t0 + Duration::from_secs(5)).is_none());
        // stays gone
        assert!(notifier.active_at(t0).is_none());
    }

    #[test]
    fn test_replacement_restarts_timer() {
        let mut notifier = Notifier::new(Duration::from_secs(5));
        let t0 = Instant::now();
        notifier.show_at(Level::Info, "first", t0);
        notifier.show_at(Level::Info, "second", t0 + Duration::from_secs(4));

        let notice = notifier.active_at(t0 + Duration::from_secs(6)).unwrap();
        assert_eq!(notice.text, "second");
    }

    #[test]
    fn test_dismiss() {
        let mut notifier = Notifier::default();
        notifier.show(Level::Success, "ok");
        notifier.dismiss();
        assert!(notifier.active().is_none());
    }

    #[test]
    fn test_banner_contains_text() {
        let mut notifier = Notifier::default();
        let banner = notifier.show(Level::Error, "Network error").banner();
        assert!(banner.contains("Network error"));
    }
}
