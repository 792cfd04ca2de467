//! The page: every region, form and the notifier, wired to one API client.

use crate::api::{ApiClient, ListQuery};
use crate::forms::{Forms, Reload};
use crate::interact::{dispatch, Click, Dialog, Dispatcher, Region};
use crate::models::{Book, Transaction, User};
use crate::notify::{Level, Notifier};
use crate::transcript::ActivityLog;
use crate::view::{ListView, Row};

pub struct Page {
    pub api: ApiClient,
    pub books: ListView<Book>,
    pub users: ListView<User>,
    pub transactions: ListView<Transaction>,
    pub book_filter: ListQuery,
    pub user_filter: ListQuery,
    pub transaction_filter: ListQuery,
    pub forms: Forms,
    pub notifier: Notifier,
    dispatcher: Dispatcher,
    log: ActivityLog,
    plain_output: bool,
}

impl Page {
    pub fn new(api: ApiClient, notifier: Notifier, log: ActivityLog) -> Self {
        Self {
            api,
            books: ListView::new(),
            users: ListView::new(),
            transactions: ListView::new(),
            book_filter: ListQuery::default(),
            user_filter: ListQuery::default(),
            transaction_filter: ListQuery::default(),
            forms: Forms::default(),
            notifier,
            dispatcher: Dispatcher::default(),
            log,
            plain_output: false,
        }
    }

    /// Apply a default `limit` to every list
    pub fn with_page_size(mut self, limit: Option<u32>) -> Self {
        self.book_filter.limit = limit;
        self.user_filter.limit = limit;
        self.transaction_filter.limit = limit;
        self
    }

    /// Print regions as plain lines instead of colored tables
    pub fn with_plain_output(mut self, plain: bool) -> Self {
        self.plain_output = plain;
        self
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn notify(&mut self, level: Level, text: impl Into<String>) {
        let notice = self.notifier.show(level, text);
        self.log.notice(level.as_str(), &notice.text);
    }

    /// Initial fetch of every region
    pub fn load_all(&mut self) {
        self.reload_books();
        self.reload_users();
        self.reload_transactions();
    }

    // A failed load leaves the error row in the region; the transport
    // failure itself is already in the transcript.
    pub fn reload_books(&mut self) {
        self.books.load(|| self.api.list_books(&self.book_filter));
    }

    pub fn reload_users(&mut self) {
        self.users.load(|| self.api.list_users(&self.user_filter));
    }

    pub fn reload_transactions(&mut self) {
        self.transactions
            .load(|| self.api.list_transactions(&self.transaction_filter));
    }

    pub fn reload(&mut self, reload: Reload) {
        if reload.books {
            self.reload_books();
        }
        if reload.users {
            self.reload_users();
        }
        if reload.transactions {
            self.reload_transactions();
        }
    }

    pub fn reload_region(&mut self, region: Region) {
        match region {
            Region::Books => self.reload_books(),
            Region::Users => self.reload_users(),
            Region::Transactions => self.reload_transactions(),
        }
    }

    pub fn filter_mut(&mut self, region: Region) -> &mut ListQuery {
        match region {
            Region::Books => &mut self.book_filter,
            Region::Users => &mut self.user_filter,
            Region::Transactions => &mut self.transaction_filter,
        }
    }

    pub fn row(&self, region: Region, record_id: i64) -> Option<&Row> {
        match region {
            Region::Books => self.books.find(record_id),
            Region::Users => self.users.find(record_id),
            Region::Transactions => self.transactions.find(record_id),
        }
    }

    pub fn region_text(&self, region: Region) -> String {
        match (region, self.plain_output) {
            (Region::Books, false) => self.books.to_text(),
            (Region::Books, true) => self.books.to_plain_text(),
            (Region::Users, false) => self.users.to_text(),
            (Region::Users, true) => self.users.to_plain_text(),
            (Region::Transactions, false) => self.transactions.to_text(),
            (Region::Transactions, true) => self.transactions.to_plain_text(),
        }
    }

    pub fn region_summary(&self, region: Region) -> String {
        match region {
            Region::Books => self.books.summary(),
            Region::Users => self.users.summary(),
            Region::Transactions => self.transactions.summary(),
        }
    }

    pub fn click(&mut self, click: Click) -> Option<Dialog> {
        dispatch(self, click)
    }
}
