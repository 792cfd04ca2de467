//! In-memory stand-in for the library server, used by tests.
//!
//! Mirrors the server's routes, status codes and `detail` messages closely
//! enough that the client can be exercised end to end without a network.

use crate::api::{ApiRequest, Method, RawResponse, Transport, TransportError};
use crate::models::{Book, Transaction, TransactionStatus, User};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Default)]
struct State {
    books: Vec<Book>,
    users: Vec<User>,
    transactions: Vec<Transaction>,
    next_id: i64,
    requests: Vec<ApiRequest>,
    overrides: HashMap<String, (u16, String)>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Clone, Default)]
pub struct FakeLibrary {
    state: Rc<RefCell<State>>,
}

fn ok(body: Value) -> RawResponse {
    RawResponse {
        status: 200,
        body: body.to_string(),
    }
}

fn fail(status: u16, detail: &str) -> RawResponse {
    RawResponse {
        status,
        body: json!({ "detail": detail }).to_string(),
    }
}

fn missing_fields(fields: &[&str]) -> RawResponse {
    let detail: Vec<Value> = fields
        .iter()
        .map(|f| json!({ "loc": ["body", f], "msg": "Field required", "type": "missing" }))
        .collect();
    RawResponse {
        status: 422,
        body: json!({ "detail": detail }).to_string(),
    }
}

fn text_field(body: &Value, field: &str) -> Option<String> {
    body.get(field).and_then(Value::as_str).map(str::to_string)
}

fn query_param<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn page<T: Clone>(items: Vec<T>, request: &ApiRequest) -> Vec<T> {
    let skip = query_param(request, "skip")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let limit = query_param(request, "limit")
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);
    items.into_iter().skip(skip).take(limit).collect()
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_book(&self, title: &str, author: &str, isbn: &str) -> Book {
        let mut state = self.state.borrow_mut();
        let book = Book {
            id: state.next_id(),
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            available: true,
        };
        state.books.push(book.clone());
        book
    }

    pub fn add_user(&self, name: &str, email: &str) -> User {
        let mut state = self.state.borrow_mut();
        let user = User {
            id: state.next_id(),
            name: name.to_string(),
            email: email.to_string(),
        };
        state.users.push(user.clone());
        user
    }

    pub fn add_transaction(
        &self,
        user_id: i64,
        book_id: i64,
        status: TransactionStatus,
        due_date: Option<DateTime<Utc>>,
    ) -> Transaction {
        let mut state = self.state.borrow_mut();
        let txn = Transaction {
            id: state.next_id(),
            user_id,
            book_id,
            status,
            timestamp: Some(Utc::now()),
            due_date,
        };
        state.transactions.push(txn.clone());
        txn
    }

    pub fn book(&self, id: i64) -> Option<Book> {
        self.state.borrow().books.iter().find(|b| b.id == id).cloned()
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.state.borrow().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn transaction_count(&self) -> usize {
        self.state.borrow().transactions.len()
    }

    /// Answer every request for `path` with a fixed status and body
    pub fn respond_raw(&self, path: &str, status: u16, body: &str) {
        self.state
            .borrow_mut()
            .overrides
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn last_request(&self) -> Option<ApiRequest> {
        self.state.borrow().requests.last().cloned()
    }

    /// Requests other than `GET`, i.e. the ones that change server state
    pub fn mutations(&self) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != Method::Get)
            .collect()
    }

    fn route(&self, request: &ApiRequest) -> RawResponse {
        let segments: Vec<&str> = request
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let body = request.body.clone().unwrap_or(Value::Null);
        let mut state = self.state.borrow_mut();

        match (request.method, segments.as_slice()) {
            (Method::Get, []) => ok(json!({
                "message": "Library Management System API",
                "docs": "/docs",
                "endpoints": { "books": "/books/", "users": "/users/", "transactions": "/transactions/" },
            })),

            (Method::Get, ["books"]) => {
                let mut books = state.books.clone();
                if let Some(q) = query_param(request, "query") {
                    books.retain(|b| {
                        b.title.contains(q)
                            || b.author.contains(q)
                            || b.isbn.contains(q)
                            || q.parse::<i64>() == Ok(b.id)
                    });
                }
                match query_param(request, "sort_by") {
                    Some("title") => books.sort_by(|a, b| a.title.cmp(&b.title)),
                    Some("author") => books.sort_by(|a, b| a.author.cmp(&b.author)),
                    Some("available") => books.sort_by(|a, b| b.available.cmp(&a.available)),
                    _ => {}
                }
                ok(json!(page(books, request)))
            }
            (Method::Post, ["books"]) => {
                let (Some(title), Some(author), Some(isbn)) = (
                    text_field(&body, "title"),
                    text_field(&body, "author"),
                    text_field(&body, "isbn"),
                ) else {
                    return missing_fields(&["title", "author", "isbn"]);
                };
                let book = Book {
                    id: state.next_id(),
                    title,
                    author,
                    isbn,
                    available: true,
                };
                state.books.push(book.clone());
                ok(json!(book))
            }
            (method, ["books", id, rest @ ..]) => {
                let Some(idx) = id
                    .parse::<i64>()
                    .ok()
                    .and_then(|id| state.books.iter().position(|b| b.id == id))
                else {
                    return fail(404, "Book not found");
                };
                match (method, rest) {
                    (Method::Get, []) => ok(json!(state.books[idx])),
                    (Method::Put, []) => {
                        let book = &mut state.books[idx];
                        if let Some(title) = text_field(&body, "title") {
                            book.title = title;
                        }
                        if let Some(author) = text_field(&body, "author") {
                            book.author = author;
                        }
                        if let Some(isbn) = text_field(&body, "isbn") {
                            book.isbn = isbn;
                        }
                        ok(json!(book))
                    }
                    (Method::Delete, []) => {
                        state.books.remove(idx);
                        ok(json!({ "message": "Book deleted successfully" }))
                    }
                    (Method::Put, ["toggle-availability"]) => {
                        let book = &mut state.books[idx];
                        book.available = !book.available;
                        ok(json!(book))
                    }
                    _ => fail(405, "Method Not Allowed"),
                }
            }

            (Method::Get, ["users"]) => {
                let mut users = state.users.clone();
                if let Some(q) = query_param(request, "query") {
                    users.retain(|u| {
                        u.name.contains(q) || u.email.contains(q) || q.parse::<i64>() == Ok(u.id)
                    });
                }
                if query_param(request, "sort_by") == Some("name") {
                    users.sort_by(|a, b| a.name.cmp(&b.name));
                }
                ok(json!(page(users, request)))
            }
            (Method::Post, ["users"]) => {
                let (Some(name), Some(email)) =
                    (text_field(&body, "name"), text_field(&body, "email"))
                else {
                    return missing_fields(&["name", "email"]);
                };
                let user = User {
                    id: state.next_id(),
                    name,
                    email,
                };
                state.users.push(user.clone());
                ok(json!(user))
            }
            (Method::Get, ["users", id, "transactions"]) => {
                let id = id.parse::<i64>().unwrap_or(-1);
                let history: Vec<&Transaction> = state
                    .transactions
                    .iter()
                    .filter(|t| t.user_id == id)
                    .collect();
                if history.is_empty() {
                    return fail(404, "User or transactions not found");
                }
                ok(json!(history))
            }
            (method, ["users", id]) => {
                let Some(idx) = id
                    .parse::<i64>()
                    .ok()
                    .and_then(|id| state.users.iter().position(|u| u.id == id))
                else {
                    return fail(404, "User not found");
                };
                match method {
                    Method::Get => ok(json!(state.users[idx])),
                    Method::Put => {
                        let user = &mut state.users[idx];
                        if let Some(name) = text_field(&body, "name") {
                            user.name = name;
                        }
                        if let Some(email) = text_field(&body, "email") {
                            user.email = email;
                        }
                        ok(json!(user))
                    }
                    Method::Delete => {
                        state.users.remove(idx);
                        ok(json!({ "message": "User deleted successfully" }))
                    }
                    Method::Post => fail(405, "Method Not Allowed"),
                }
            }

            (Method::Get, ["transactions"]) => {
                let mut txns = state.transactions.clone();
                if let Some(q) = query_param(request, "query") {
                    let as_id = q.parse::<i64>().ok();
                    txns.retain(|t| {
                        t.status.as_str().contains(q)
                            || as_id.is_some_and(|id| {
                                t.id == id || t.user_id == id || t.book_id == id
                            })
                    });
                }
                ok(json!(page(txns, request)))
            }
            (Method::Post, ["transactions", "issue"]) => {
                let user_id = body.get("user_id").and_then(Value::as_i64);
                let book_id = body.get("book_id").and_then(Value::as_i64);
                let (Some(user_id), Some(book_id)) = (user_id, book_id) else {
                    return missing_fields(&["user_id", "book_id"]);
                };
                let book = state
                    .books
                    .iter()
                    .position(|b| b.id == book_id && b.available);
                let user_exists = state.users.iter().any(|u| u.id == user_id);
                let (Some(book), true) = (book, user_exists) else {
                    return fail(400, "Book not available or user/book not found");
                };
                state.books[book].available = false;
                let txn = Transaction {
                    id: state.next_id(),
                    user_id,
                    book_id,
                    status: TransactionStatus::Borrowed,
                    timestamp: Some(Utc::now()),
                    due_date: None,
                };
                state.transactions.push(txn.clone());
                ok(json!(txn))
            }
            (Method::Put, ["transactions", id, "return"]) => {
                let id = id.parse::<i64>().unwrap_or(-1);
                let Some(idx) = state
                    .transactions
                    .iter()
                    .position(|t| t.id == id && t.status == TransactionStatus::Borrowed)
                else {
                    return fail(400, "Transaction not found or book already returned");
                };
                state.transactions[idx].status = TransactionStatus::Returned;
                let book_id = state.transactions[idx].book_id;
                if let Some(book) = state.books.iter_mut().find(|b| b.id == book_id) {
                    book.available = true;
                }
                ok(json!(state.transactions[idx]))
            }

            _ => fail(404, "Not Found"),
        }
    }
}

impl Transport for FakeLibrary {
    fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.state.borrow_mut().requests.push(request.clone());
        let forced = self.state.borrow().overrides.get(&request.path).cloned();
        if let Some((status, body)) = forced {
            return Ok(RawResponse { status, body });
        }
        Ok(self.route(request))
    }
}

/// A server that can never be reached
pub struct UnreachableServer;

impl Transport for UnreachableServer {
    fn send(&self, _request: &ApiRequest) -> Result<RawResponse, TransportError> {
        Err(TransportError::Io("Connection refused".to_string()))
    }
}

/// A page talking to `fake`, with logging off
pub fn test_page(fake: &FakeLibrary) -> crate::page::Page {
    let api = crate::api::ApiClient::new("http://library.test", Box::new(fake.clone()));
    crate::page::Page::new(
        api,
        crate::notify::Notifier::default(),
        crate::transcript::ActivityLog::disabled(),
    )
}
