//! Row layouts for books, users and transactions.

use crate::models::{Book, Transaction, TransactionStatus, User};
use crate::view::{ActionKind, Cell, Control, Listable, Tone};
use chrono::{DateTime, Utc};

impl Listable for Book {
    const NOUN: &'static str = "books";
    const COLUMNS: &'static [&'static str] = &["ID", "Title", "Author", "ISBN", "Status"];

    fn record_id(&self) -> i64 {
        self.id
    }

    fn cells(&self, _now: DateTime<Utc>) -> Vec<Cell> {
        let tone = if self.available {
            Tone::Good
        } else {
            Tone::Alert
        };
        vec![
            Cell::plain(self.id.to_string()),
            Cell::plain(&self.title),
            Cell::plain(&self.author),
            Cell::plain(&self.isbn),
            Cell::toned(self.availability_label(), tone),
        ]
    }

    fn controls(&self) -> Vec<Control> {
        vec![Control {
            kind: ActionKind::Toggle,
            label: self.toggle_label().to_string(),
            record_id: self.id,
        }]
    }
}

impl Listable for User {
    const NOUN: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Email"];

    fn record_id(&self) -> i64 {
        self.id
    }

    fn cells(&self, _now: DateTime<Utc>) -> Vec<Cell> {
        vec![
            Cell::plain(self.id.to_string()),
            Cell::plain(&self.name),
            Cell::plain(&self.email),
        ]
    }

    fn controls(&self) -> Vec<Control> {
        vec![Control {
            kind: ActionKind::History,
            label: "History".to_string(),
            record_id: self.id,
        }]
    }
}

impl Listable for Transaction {
    const NOUN: &'static str = "transactions";
    const COLUMNS: &'static [&'static str] =
        &["ID", "User", "Book", "Status", "Issued", "Due"];

    fn record_id(&self) -> i64 {
        self.id
    }

    fn cells(&self, now: DateTime<Utc>) -> Vec<Cell> {
        let tone = if self.is_overdue(now) {
            Tone::Alert
        } else if self.status == TransactionStatus::Returned {
            Tone::Muted
        } else {
            Tone::Plain
        };
        vec![
            Cell::plain(self.id.to_string()),
            Cell::plain(self.user_id.to_string()),
            Cell::plain(self.book_id.to_string()),
            Cell::toned(self.status_label(now), tone),
            Cell::plain(format_date(self.timestamp)),
            Cell::plain(format_date(self.due_date)),
        ]
    }
}

pub fn format_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d").to_string(),
        None => "-".to_string(),
    }
}

/// One line of a user's history dialog
pub fn history_line(txn: &Transaction, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "#{} book {} - {}",
        txn.id,
        txn.book_id,
        txn.status_label(now)
    );
    if let Some(due) = txn.due_date {
        line.push_str(&format!(" (due {})", due.format("%Y-%m-%d")));
    }
    line
}
