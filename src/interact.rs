//! Click routing for the list regions.
//!
//! One [`Dispatcher`] per page. A click names a region, a record id and
//! optionally a control; the dispatcher checks it against the rows currently
//! rendered and looks the handler up by (region, action).

use crate::forms::failure_message;
use crate::notify::Level;
use crate::page::Page;
use crate::render::history_line;
use crate::view::ActionKind;
use chrono::Utc;
use colored::Colorize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Books,
    Users,
    Transactions,
}

impl Region {
    pub const ALL: [Region; 3] = [Self::Books, Self::Users, Self::Transactions];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "books" | "book" => Some(Self::Books),
            "users" | "user" => Some(Self::Users),
            "transactions" | "transaction" | "txns" => Some(Self::Transactions),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Books => "books",
            Self::Users => "users",
            Self::Transactions => "transactions",
        }
    }

    /// Orderings the server understands for this region's list endpoint
    pub fn sort_keys(&self) -> &'static [&'static str] {
        match self {
            Self::Books => &["title", "author", "available"],
            Self::Users => &["name"],
            Self::Transactions => &[],
        }
    }
}

/// A click on a row (`control: None`) or on one of its controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Click {
    pub region: Region,
    pub record_id: i64,
    pub control: Option<ActionKind>,
}

/// Informational display the user has to acknowledge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub title: String,
    pub lines: Vec<String>,
}

impl Dialog {
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("Not found", vec![message.to_string()])
    }

    pub fn to_text(&self) -> String {
        let width = self
            .lines
            .iter()
            .map(|l| l.chars().count())
            .chain(std::iter::once(self.title.chars().count()))
            .max()
            .unwrap_or(0);
        let rule = "-".repeat(width + 4);
        let mut out = format!("+{}+\n", rule);
        let title = format!("{:<width$}", self.title, width = width);
        out.push_str(&format!("|  {}  |\n", title.bold()));
        out.push_str(&format!("+{}+\n", rule));
        for line in &self.lines {
            out.push_str(&format!("|  {:<width$}  |\n", line, width = width));
        }
        out.push_str(&format!("+{}+\n", rule));
        out
    }
}

pub type Handler = fn(&mut Page, i64) -> Option<Dialog>;

/// Single routing table keyed by (region, action)
pub struct Dispatcher {
    routes: HashMap<(Region, ActionKind), Handler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut dispatcher = Self {
            routes: HashMap::new(),
        };
        dispatcher.register(Region::Books, ActionKind::Details, book_details);
        dispatcher.register(Region::Books, ActionKind::Toggle, toggle_availability);
        dispatcher.register(Region::Users, ActionKind::Details, user_details);
        dispatcher.register(Region::Users, ActionKind::History, user_history);
        dispatcher
    }
}

impl Dispatcher {
    pub fn register(&mut self, region: Region, action: ActionKind, handler: Handler) {
        self.routes.insert((region, action), handler);
    }

    pub fn route(&self, region: Region, action: ActionKind) -> Option<Handler> {
        self.routes.get(&(region, action)).copied()
    }
}

/// Route a click on the page.
///
/// Clicks on ids that are not currently rendered, or on controls the row
/// does not carry, are reported and go nowhere.
pub fn dispatch(page: &mut Page, click: Click) -> Option<Dialog> {
    let controls: Option<Vec<ActionKind>> = page
        .row(click.region, click.record_id)
        .map(|row| row.controls().iter().map(|c| c.kind).collect());
    let action = {
        let Some(controls) = controls else {
            page.notify(
                Level::Info,
                format!(
                    "No {} row with id {} in the current list",
                    click.region.as_str(),
                    click.record_id
                ),
            );
            return None;
        };
        match click.control {
            None => ActionKind::Details,
            Some(kind) if controls.contains(&kind) => kind,
            Some(kind) => {
                page.notify(
                    Level::Info,
                    format!(
                        "Rows in {} have no '{}' control",
                        click.region.as_str(),
                        kind.as_str()
                    ),
                );
                return None;
            }
        }
    };

    let handler = page.dispatcher().route(click.region, action)?;
    page.log()
        .click(click.region.as_str(), click.record_id, Some(action.as_str()));
    handler(page, click.record_id)
}

fn book_details(page: &mut Page, id: i64) -> Option<Dialog> {
    match page.api.get_book(id) {
        Ok(book) => Some(Dialog::new(
            format!("Book #{}", book.id),
            vec![
                format!("Title:  {}", book.title),
                format!("Author: {}", book.author),
                format!("ISBN:   {}", book.isbn),
                format!("Status: {}", book.availability_label()),
            ],
        )),
        Err(e) if e.is_not_found() => Some(Dialog::not_found("Book not found")),
        Err(e) => {
            page.notify(Level::Error, failure_message(&e));
            None
        }
    }
}

fn toggle_availability(page: &mut Page, id: i64) -> Option<Dialog> {
    match page.api.toggle_availability(id) {
        Ok(book) => {
            page.notify(
                Level::Success,
                format!(
                    "\"{}\" is now {}",
                    book.title,
                    book.availability_label().to_lowercase()
                ),
            );
            page.reload_books();
        }
        Err(e) => page.notify(Level::Error, failure_message(&e)),
    }
    None
}

fn user_details(page: &mut Page, id: i64) -> Option<Dialog> {
    match page.api.get_user(id) {
        Ok(user) => Some(Dialog::new(
            format!("User #{}", user.id),
            vec![
                format!("Name:  {}", user.name),
                format!("Email: {}", user.email),
            ],
        )),
        Err(e) if e.is_not_found() => Some(Dialog::not_found("User not found")),
        Err(e) => {
            page.notify(Level::Error, failure_message(&e));
            None
        }
    }
}

const NO_HISTORY: &str = "No transactions found for this user";

fn user_history(page: &mut Page, id: i64) -> Option<Dialog> {
    match page.api.user_transactions(id) {
        Ok(txns) => {
            let now = Utc::now();
            let lines = if txns.is_empty() {
                vec![NO_HISTORY.to_string()]
            } else {
                txns.iter().map(|t| history_line(t, now)).collect()
            };
            Some(Dialog::new(
                format!("Transaction history for user #{}", id),
                lines,
            ))
        }
        Err(e) if e.is_not_found() => Some(Dialog::not_found(NO_HISTORY)),
        Err(e) => {
            page.notify(Level::Error, failure_message(&e));
            None
        }
    }
}
