//! Owned display regions.
//!
//! A [`ListView`] is the only writer of its rows. Every render is a full
//! replacement, so a later load always wins and a stale row never survives.

use chrono::{DateTime, Utc};
use colored::Colorize;
use std::marker::PhantomData;

/// Emphasis of a cell, mapped to terminal colors when printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    #[default]
    Plain,
    Good,
    Muted,
    Alert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    pub tone: Tone,
}

impl Cell {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: Tone::Plain,
        }
    }

    pub fn toned(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    fn paint(&self, width: usize) -> String {
        let padded = format!("{:<width$}", self.text, width = width);
        match self.tone {
            Tone::Plain => padded,
            Tone::Good => padded.green().to_string(),
            Tone::Muted => padded.dimmed().to_string(),
            Tone::Alert => padded.red().bold().to_string(),
        }
    }
}

/// What a click on a row or one of its controls asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Details,
    Toggle,
    History,
}

impl ActionKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "details" | "detail" | "open" => Some(Self::Details),
            "toggle" => Some(Self::Toggle),
            "history" => Some(Self::History),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Toggle => "toggle",
            Self::History => "history",
        }
    }
}

/// An action control embedded in a row, carrying the row's record id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub kind: ActionKind,
    pub label: String,
    pub record_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Record {
        id: i64,
        cells: Vec<Cell>,
        controls: Vec<Control>,
    },
    Placeholder(String),
}

impl Row {
    pub fn record_id(&self) -> Option<i64> {
        match self {
            Self::Record { id, .. } => Some(*id),
            Self::Placeholder(_) => None,
        }
    }

    pub fn controls(&self) -> &[Control] {
        match self {
            Self::Record { controls, .. } => controls,
            Self::Placeholder(_) => &[],
        }
    }

    /// Cell texts joined with `|`, for assertions and plain output
    pub fn plain_text(&self) -> String {
        match self {
            Self::Record {
                cells, controls, ..
            } => {
                let mut parts: Vec<&str> = cells.iter().map(|c| c.text.as_str()).collect();
                parts.extend(controls.iter().map(|c| c.label.as_str()));
                parts.join(" | ")
            }
            Self::Placeholder(text) => text.clone(),
        }
    }
}

/// A record type that knows how to lay itself out as a row
pub trait Listable {
    /// Plural noun used in headings and placeholders ("books")
    const NOUN: &'static str;
    const COLUMNS: &'static [&'static str];

    fn record_id(&self) -> i64;
    fn cells(&self, now: DateTime<Utc>) -> Vec<Cell>;
    fn controls(&self) -> Vec<Control> {
        Vec::new()
    }

    fn to_row(&self, now: DateTime<Utc>) -> Row {
        Row::Record {
            id: self.record_id(),
            cells: self.cells(now),
            controls: self.controls(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Pristine,
    Loaded(usize),
    Empty,
    Failed,
}

pub struct ListView<T> {
    rows: Vec<Row>,
    state: ViewState,
    _record: PhantomData<T>,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            state: ViewState::Pristine,
            _record: PhantomData,
        }
    }
}

impl<T: Listable> ListView<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the region with one row per record, in the given order
    pub fn render(&mut self, records: &[T], now: DateTime<Utc>) {
        self.rows.clear();
        if records.is_empty() {
            self.rows
                .push(Row::Placeholder(format!("No {} found", T::NOUN)));
            self.state = ViewState::Empty;
            return;
        }
        self.rows.extend(records.iter().map(|r| r.to_row(now)));
        self.state = ViewState::Loaded(records.len());
    }

    /// Replace the region with a single error row
    pub fn render_error(&mut self) {
        self.rows.clear();
        self.rows
            .push(Row::Placeholder(format!("Error loading {}", T::NOUN)));
        self.state = ViewState::Failed;
    }

    /// Fetch and render; a failed fetch becomes the error row and is returned
    /// only for logging.
    pub fn load<E, F>(&mut self, fetch: F) -> Option<E>
    where
        F: FnOnce() -> Result<Vec<T>, E>,
    {
        match fetch() {
            Ok(records) => {
                self.render(&records, Utc::now());
                None
            }
            Err(e) => {
                self.render_error();
                Some(e)
            }
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn find(&self, record_id: i64) -> Option<&Row> {
        self.rows.iter().find(|r| r.record_id() == Some(record_id))
    }

    /// One line per row, no colors or padding
    pub fn to_plain_text(&self) -> String {
        let mut out = format!("{}\n", capitalize(T::NOUN));
        if self.state() == ViewState::Pristine {
            out.push_str("  (not loaded)\n");
            return out;
        }
        for row in self.rows() {
            out.push_str(&format!("  {}\n", row.plain_text()));
        }
        out
    }

    pub fn summary(&self) -> String {
        match self.state() {
            ViewState::Pristine => "not loaded".to_string(),
            ViewState::Loaded(n) => format!("{} shown", n),
            ViewState::Empty => format!("no {}", T::NOUN),
            ViewState::Failed => "failed to load".to_string(),
        }
    }

    /// Terminal table: heading, column header, then rows
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n", capitalize(T::NOUN).bold());
        if self.state == ViewState::Pristine {
            out.push_str(&format!("  {}\n", "(not loaded)".dimmed()));
            return out;
        }

        let mut widths: Vec<usize> = T::COLUMNS.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            if let Row::Record { cells, .. } = row {
                for (i, cell) in cells.iter().enumerate() {
                    if let Some(w) = widths.get_mut(i) {
                        *w = (*w).max(cell.text.chars().count());
                    }
                }
            }
        }

        let header: Vec<String> = T::COLUMNS
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        out.push_str(&format!("  {}\n", header.join("  ").dimmed()));

        for row in &self.rows {
            match row {
                Row::Record {
                    cells, controls, ..
                } => {
                    let painted: Vec<String> = cells
                        .iter()
                        .zip(&widths)
                        .map(|(cell, w)| cell.paint(*w))
                        .collect();
                    let buttons: Vec<String> = controls
                        .iter()
                        .map(|c| format!("[{}]", c.label).cyan().to_string())
                        .collect();
                    out.push_str(&format!("  {}  {}\n", painted.join("  "), buttons.join(" ")));
                }
                Row::Placeholder(text) => {
                    out.push_str(&format!("  {}\n", text.dimmed()));
                }
            }
        }
        out
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
