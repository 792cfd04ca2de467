//! Records and request payloads exchanged with the library API.
//!
//! The server owns every record; the client only keeps the copies it fetched
//! for the current render.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub available: bool,
}

impl Book {
    pub fn availability_label(&self) -> &'static str {
        if self.available {
            "Available"
        } else {
            "Checked out"
        }
    }

    /// Label of the control that flips availability
    pub fn toggle_label(&self) -> &'static str {
        if self.available {
            "Check out"
        } else {
            "Check in"
        }
    }
}

/// Body of `POST /books/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: String,
}

/// Body of `PUT /books/{id}`; unset fields are left alone by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Body of `POST /users/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Body of `PUT /users/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Lending state as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    Borrowed,
    Returned,
    Other(String),
}

impl TransactionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Borrowed => "borrowed",
            Self::Returned => "returned",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "borrowed" => Self::Borrowed,
            "returned" => Self::Returned,
            _ => Self::Other(s),
        }
    }
}

impl From<TransactionStatus> for String {
    fn from(status: TransactionStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub book_id: i64,
    pub status: TransactionStatus,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub due_date: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Borrowed and past its due date. Display only, never sent anywhere.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Borrowed && self.due_date.is_some_and(|due| due < now)
    }

    /// Status text shown in lists and history
    pub fn status_label(&self, now: DateTime<Utc>) -> String {
        if self.is_overdue(now) {
            "OVERDUE".to_string()
        } else {
            self.status.as_str().to_string()
        }
    }
}

/// Body of `POST /transactions/issue/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRequest {
    pub user_id: i64,
    pub book_id: i64,
}

/// Confirmation body returned by the delete endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct Confirmation {
    pub message: String,
}

/// Landing document served at `GET /`
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    #[serde(default)]
    pub docs: Option<String>,
    #[serde(default)]
    pub endpoints: BTreeMap<String, String>,
}

/// Parse a server timestamp.
///
/// Accepts RFC 3339, a naive ISO-8601 date-time (taken as UTC, which is what
/// the server stores) or a bare date.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = s.parse::<NaiveDateTime>() {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
    }
}
