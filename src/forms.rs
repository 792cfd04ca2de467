//! Named forms and their submit handlers.
//!
//! A form keeps its field values between commands. Success clears it,
//! any failure (client-side validation or server rejection) leaves the
//! values in place so the user can correct and resubmit.

use crate::api::{ApiClient, ApiError, NETWORK_ERROR};
use crate::models::{BookChanges, IssueRequest, NewBook, NewUser, UserChanges};
use crate::notify::Level;
use crate::page::Page;
use colored::Colorize;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
}

const fn required(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        label,
        required: true,
    }
}

const fn optional(name: &'static str, label: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        label,
        required: false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    AddBook,
    UpdateBook,
    DeleteBook,
    AddUser,
    UpdateUser,
    DeleteUser,
    IssueBook,
    ReturnBook,
}

impl FormKind {
    pub const ALL: [FormKind; 8] = [
        Self::AddBook,
        Self::UpdateBook,
        Self::DeleteBook,
        Self::AddUser,
        Self::UpdateUser,
        Self::DeleteUser,
        Self::IssueBook,
        Self::ReturnBook,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == s)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AddBook => "add-book",
            Self::UpdateBook => "update-book",
            Self::DeleteBook => "delete-book",
            Self::AddUser => "add-user",
            Self::UpdateUser => "update-user",
            Self::DeleteUser => "delete-user",
            Self::IssueBook => "issue",
            Self::ReturnBook => "return",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::AddBook => "Add book",
            Self::UpdateBook => "Update book",
            Self::DeleteBook => "Delete book",
            Self::AddUser => "Add user",
            Self::UpdateUser => "Update user",
            Self::DeleteUser => "Delete user",
            Self::IssueBook => "Issue book",
            Self::ReturnBook => "Return book",
        }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        const ADD_BOOK: &[FieldSpec] = &[
            required("title", "Title"),
            required("author", "Author"),
            required("isbn", "ISBN"),
        ];
        const UPDATE_BOOK: &[FieldSpec] = &[
            required("book_id", "Book ID"),
            optional("title", "Title"),
            optional("author", "Author"),
            optional("isbn", "ISBN"),
        ];
        const DELETE_BOOK: &[FieldSpec] = &[required("book_id", "Book ID")];
        const ADD_USER: &[FieldSpec] = &[required("name", "Name"), required("email", "Email")];
        const UPDATE_USER: &[FieldSpec] = &[
            required("user_id", "User ID"),
            optional("name", "Name"),
            optional("email", "Email"),
        ];
        const DELETE_USER: &[FieldSpec] = &[required("user_id", "User ID")];
        const ISSUE: &[FieldSpec] = &[required("user_id", "User ID"), required("book_id", "Book ID")];
        const RETURN: &[FieldSpec] = &[required("transaction_id", "Transaction ID")];

        match self {
            Self::AddBook => ADD_BOOK,
            Self::UpdateBook => UPDATE_BOOK,
            Self::DeleteBook => DELETE_BOOK,
            Self::AddUser => ADD_USER,
            Self::UpdateUser => UPDATE_USER,
            Self::DeleteUser => DELETE_USER,
            Self::IssueBook => ISSUE,
            Self::ReturnBook => RETURN,
        }
    }
}

/// Held for the duration of a submission; dropping it re-enables the form
pub struct SubmitGuard {
    in_flight: Rc<Cell<bool>>,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.in_flight.set(false);
    }
}

#[derive(Debug)]
pub struct Form {
    kind: FormKind,
    values: Vec<String>,
    in_flight: Rc<Cell<bool>>,
}

impl Form {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            values: vec![String::new(); kind.fields().len()],
            in_flight: Rc::new(Cell::new(false)),
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    fn index(&self, field: &str) -> Option<usize> {
        self.kind.fields().iter().position(|f| f.name == field)
    }

    pub fn set(&mut self, field: &str, value: &str) -> Result<(), String> {
        match self.index(field) {
            Some(i) => {
                self.values[i] = value.to_string();
                Ok(())
            }
            None => Err(format!(
                "Unknown field '{}' for {}. Fields: {}",
                field,
                self.kind.name(),
                self.kind
                    .fields()
                    .iter()
                    .map(|f| f.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }

    pub fn value(&self, field: &str) -> &str {
        self.index(field)
            .map(|i| self.values[i].as_str())
            .unwrap_or("")
    }

    pub fn clear(&mut self) {
        for value in &mut self.values {
            value.clear();
        }
    }

    pub fn is_pristine(&self) -> bool {
        self.values.iter().all(String::is_empty)
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.get()
    }

    /// Claim the form for one submission; `None` while another is unresolved
    pub fn begin_submit(&self) -> Option<SubmitGuard> {
        if self.in_flight.replace(true) {
            return None;
        }
        Some(SubmitGuard {
            in_flight: Rc::clone(&self.in_flight),
        })
    }

    fn field_spec(&self, field: &str) -> FieldSpec {
        self.kind
            .fields()
            .iter()
            .copied()
            .find(|f| f.name == field)
            .unwrap_or(FieldSpec {
                name: "",
                label: "",
                required: false,
            })
    }

    fn text(&self, field: &str) -> Result<String, String> {
        let value = self.value(field);
        if value.trim().is_empty() {
            return Err(format!("{} is required", self.field_spec(field).label));
        }
        Ok(value.to_string())
    }

    fn id(&self, field: &str) -> Result<i64, String> {
        let label = self.field_spec(field).label;
        let value = self.value(field).trim();
        if value.is_empty() {
            return Err(format!("{} is required", label));
        }
        value
            .parse::<i64>()
            .map_err(|_| format!("{} must be a number", label))
    }

    /// Included only when filled in, so the server keeps its current value
    fn optional(&self, field: &str) -> Option<String> {
        let value = self.value(field);
        if value.trim().is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("{} ({})\n", self.kind.title().bold(), self.kind.name());
        for (spec, value) in self.kind.fields().iter().zip(&self.values) {
            let marker = if spec.required { "*" } else { " " };
            out.push_str(&format!("  {}{:<15} {}\n", marker, spec.name, value));
        }
        out
    }
}

/// All forms of the page, one per kind
#[derive(Debug)]
pub struct Forms {
    forms: Vec<Form>,
}

impl Default for Forms {
    fn default() -> Self {
        Self {
            forms: FormKind::ALL.into_iter().map(Form::new).collect(),
        }
    }
}

impl Forms {
    pub fn get(&self, kind: FormKind) -> &Form {
        &self.forms[Self::slot(kind)]
    }

    pub fn get_mut(&mut self, kind: FormKind) -> &mut Form {
        &mut self.forms[Self::slot(kind)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Form> {
        self.forms.iter()
    }

    fn slot(kind: FormKind) -> usize {
        FormKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default()
    }
}

/// A validated submission, ready to send
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    AddBook(NewBook),
    UpdateBook(i64, BookChanges),
    DeleteBook(i64),
    AddUser(NewUser),
    UpdateUser(i64, UserChanges),
    DeleteUser(i64),
    Issue(IssueRequest),
    Return(i64),
}

/// Regions to reload after a successful submission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reload {
    pub books: bool,
    pub users: bool,
    pub transactions: bool,
}

impl Reload {
    const BOOKS: Reload = Reload {
        books: true,
        users: false,
        transactions: false,
    };
    const USERS: Reload = Reload {
        books: false,
        users: true,
        transactions: false,
    };
    const LENDING: Reload = Reload {
        books: true,
        users: false,
        transactions: true,
    };
}

impl Request {
    /// Read and validate the form's fields
    pub fn build(form: &Form) -> Result<Self, String> {
        let request = match form.kind() {
            FormKind::AddBook => Self::AddBook(NewBook {
                title: form.text("title")?,
                author: form.text("author")?,
                isbn: form.text("isbn")?,
            }),
            FormKind::UpdateBook => Self::UpdateBook(
                form.id("book_id")?,
                BookChanges {
                    title: form.optional("title"),
                    author: form.optional("author"),
                    isbn: form.optional("isbn"),
                },
            ),
            FormKind::DeleteBook => Self::DeleteBook(form.id("book_id")?),
            FormKind::AddUser => Self::AddUser(NewUser {
                name: form.text("name")?,
                email: form.text("email")?,
            }),
            FormKind::UpdateUser => Self::UpdateUser(
                form.id("user_id")?,
                UserChanges {
                    name: form.optional("name"),
                    email: form.optional("email"),
                },
            ),
            FormKind::DeleteUser => Self::DeleteUser(form.id("user_id")?),
            FormKind::IssueBook => Self::Issue(IssueRequest {
                user_id: form.id("user_id")?,
                book_id: form.id("book_id")?,
            }),
            FormKind::ReturnBook => Self::Return(form.id("transaction_id")?),
        };
        Ok(request)
    }

    /// Send the request; on success returns the notice text and what to reload
    pub fn send(&self, api: &ApiClient) -> Result<(String, Reload), ApiError> {
        let done = match self {
            Self::AddBook(book) => {
                api.create_book(book)?;
                ("Book added successfully".to_string(), Reload::BOOKS)
            }
            Self::UpdateBook(id, changes) => {
                api.update_book(*id, changes)?;
                ("Book updated successfully".to_string(), Reload::BOOKS)
            }
            Self::DeleteBook(id) => (api.delete_book(*id)?.message, Reload::BOOKS),
            Self::AddUser(user) => {
                api.create_user(user)?;
                ("User added successfully".to_string(), Reload::USERS)
            }
            Self::UpdateUser(id, changes) => {
                api.update_user(*id, changes)?;
                ("User updated successfully".to_string(), Reload::USERS)
            }
            Self::DeleteUser(id) => (api.delete_user(*id)?.message, Reload::USERS),
            Self::Issue(issue) => {
                api.issue_book(issue)?;
                ("Book issued successfully".to_string(), Reload::LENDING)
            }
            Self::Return(id) => {
                api.return_book(*id)?;
                ("Book returned successfully".to_string(), Reload::LENDING)
            }
        };
        Ok(done)
    }
}

/// Notice text for a failed call
pub fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Application { detail, .. } => format!("Error: {}", detail),
        ApiError::Transport(_) => NETWORK_ERROR.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Succeeded,
    Failed,
    Invalid,
    Busy,
}

impl Submission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Invalid => "invalid",
            Self::Busy => "busy",
        }
    }
}

/// Submit one form: validate, send, then notify and reload or keep the fields
pub fn submit(page: &mut Page, kind: FormKind) -> Submission {
    let Some(_guard) = page.forms.get(kind).begin_submit() else {
        page.notify(Level::Info, "Already submitting, please wait");
        page.log().submission(kind.name(), Submission::Busy.as_str());
        return Submission::Busy;
    };

    let outcome = match Request::build(page.forms.get(kind)) {
        Err(message) => {
            page.notify(Level::Error, message);
            Submission::Invalid
        }
        Ok(request) => match request.send(&page.api) {
            Ok((message, reload)) => {
                page.notify(Level::Success, message);
                page.reload(reload);
                page.forms.get_mut(kind).clear();
                Submission::Succeeded
            }
            Err(err) => {
                page.notify(Level::Error, failure_message(&err));
                Submission::Failed
            }
        },
    };
    page.log().submission(kind.name(), outcome.as_str());
    outcome
}
