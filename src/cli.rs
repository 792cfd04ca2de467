use crate::api::ListQuery;
use crate::forms::{self, failure_message, FormKind, Submission};
use crate::interact::{Click, Dialog, Region};
use crate::notify::{Level, Notice};
use crate::page::Page;
use crate::view::ActionKind;
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

pub struct Session {
    pub page: Page,
    pub session_id: String,
    last_notice: Option<Notice>,
}

/// What the front end should do after a command
#[derive(Debug, PartialEq)]
pub enum Flow {
    Continue,
    Exit,
    /// Show a dialog the user must acknowledge
    Dialog(Dialog),
}

impl Session {
    pub fn new(page: Page, session_id: String) -> Self {
        Self {
            page,
            session_id,
            last_notice: None,
        }
    }

    /// Print the active notice once, when it changes
    fn print_notice(&mut self) {
        let active = self.page.notifier.active().cloned();
        if active.is_some() && active != self.last_notice {
            if let Some(notice) = &active {
                println!("{}", notice.banner());
            }
        }
        self.last_notice = active;
    }
}

pub fn run_commands(session: &mut Session, commands: &[String]) -> Result<()> {
    session.print_notice();
    for line in commands {
        let flow = handle_command(session, line.trim());
        session.print_notice();
        match flow {
            Flow::Exit => break,
            Flow::Dialog(dialog) => print!("{}", dialog.to_text()),
            Flow::Continue => {}
        }
    }
    Ok(())
}

pub fn run_repl(mut session: Session) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("shelf - type /help for commands, /exit to quit");
    println!("Connected to {}", session.page.api.base_url());
    for region in Region::ALL {
        print!("{}", session.page.region_text(region));
    }
    session.print_notice();

    loop {
        match rl.readline("shelf> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                let flow = handle_command(&mut session, line);
                session.print_notice();
                match flow {
                    Flow::Exit => break,
                    Flow::Dialog(dialog) => {
                        print!("{}", dialog.to_text());
                        // Blocks until acknowledged
                        match rl.readline("(press Enter) ") {
                            Ok(_) => {}
                            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                            Err(e) => {
                                eprintln!("Input error: {}", e);
                                break;
                            }
                        }
                    }
                    Flow::Continue => {}
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

pub fn handle_command(session: &mut Session, line: &str) -> Flow {
    let words = match shell_words::split(line) {
        Ok(words) => words,
        Err(e) => {
            println!("Parse error: {}", e);
            return Flow::Continue;
        }
    };
    let Some((command, args)) = words.split_first() else {
        return Flow::Continue;
    };
    if !command.starts_with('/') {
        println!("Commands start with '/'. Type /help for the list");
        return Flow::Continue;
    }

    match command.as_str() {
        "/exit" | "/quit" => return Flow::Exit,
        "/help" => print_help(),
        "/session" => {
            println!("Session: {}", session.session_id);
            match session.page.log().path() {
                Some(path) => println!("Transcript: {}", path.display()),
                None => println!("Transcript: off"),
            }
        }
        "/books" => handle_list_command(&mut session.page, Region::Books, args),
        "/users" => handle_list_command(&mut session.page, Region::Users, args),
        "/transactions" => handle_list_command(&mut session.page, Region::Transactions, args),
        "/show" => handle_show_command(&session.page, args),
        "/open" => return handle_open_command(&mut session.page, args),
        "/form" => handle_form_command(&mut session.page, args),
        "/submit" => handle_submit_command(&mut session.page, args),
        "/reset" => handle_reset_command(&mut session.page, args),
        "/status" => handle_status_command(&mut session.page),
        "/notice" => match args.first().map(String::as_str) {
            Some("dismiss") => {
                session.page.notifier.dismiss();
                println!("Notice dismissed");
            }
            Some(other) => println!("Unknown /notice option: {}. Use /notice [dismiss]", other),
            None => match session.page.notifier.active() {
                Some(notice) => println!("{}", notice.banner()),
                None => println!("No active notice"),
            },
        },
        other => println!("Unknown command: {}. Type /help for the list", other),
    }
    Flow::Continue
}

fn print_help() {
    println!("Commands:");
    println!("  /exit                      - quit");
    println!("  /help                      - show commands");
    println!("  /session                   - show session info");
    println!("  /status                    - check the library server");
    println!("  /notice [dismiss]          - show or dismiss the current notice");
    println!("Lists:");
    println!("  /books [query] [--sort K] [--skip N] [--limit N] [--all]");
    println!("  /users [query] [--sort K] [--skip N] [--limit N] [--all]");
    println!("  /transactions [--skip N] [--limit N] [--all]");
    println!("  /show [region]             - print one or all regions");
    println!("  /open <region> <id> [control]");
    println!("                             - open a row (details) or press a control (toggle, history)");
    println!("Forms:");
    println!("  /form                      - list forms");
    println!("  /form <name> [field=value...]");
    println!("                             - fill in fields and show the form");
    println!("  /submit <name> [field=value...]");
    println!("  /reset <name>              - clear a form");
    println!(
        "  Form names: {}",
        FormKind::ALL
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
}

/// Options of the list commands
#[derive(Debug, Default, PartialEq)]
struct ListArgs {
    query: Vec<String>,
    sort: Option<String>,
    skip: Option<u32>,
    limit: Option<u32>,
    all: bool,
}

fn parse_list_args(args: &[String]) -> Result<ListArgs, String> {
    let mut parsed = ListArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--sort" => {
                let value = iter.next().ok_or("--sort needs a key")?;
                parsed.sort = Some(value.clone());
            }
            "--skip" => parsed.skip = Some(parse_count("--skip", iter.next())?),
            "--limit" => parsed.limit = Some(parse_count("--limit", iter.next())?),
            "--all" => parsed.all = true,
            s if s.starts_with("--") => return Err(format!("Unknown option: {}", s)),
            word => parsed.query.push(word.to_string()),
        }
    }
    Ok(parsed)
}

fn parse_count(flag: &str, value: Option<&String>) -> Result<u32, String> {
    value
        .ok_or_else(|| format!("{} needs a number", flag))?
        .parse::<u32>()
        .map_err(|_| format!("{} must be a non-negative number", flag))
}

fn apply_list_args(region: Region, filter: &mut ListQuery, args: ListArgs) -> Result<(), String> {
    if let Some(sort) = &args.sort {
        let keys = region.sort_keys();
        if keys.is_empty() {
            return Err(format!("{} cannot be sorted", region.as_str()));
        }
        if !keys.contains(&sort.as_str()) {
            return Err(format!(
                "Unknown sort key '{}' for {}. Use: {}",
                sort,
                region.as_str(),
                keys.join(", ")
            ));
        }
    }

    if args.all {
        filter.query = None;
        filter.sort_by = None;
        filter.skip = None;
    }
    if !args.query.is_empty() {
        filter.query = Some(args.query.join(" "));
    }
    if args.sort.is_some() {
        filter.sort_by = args.sort;
    }
    if args.skip.is_some() {
        filter.skip = args.skip;
    }
    if args.limit.is_some() {
        filter.limit = args.limit;
    }
    Ok(())
}

fn handle_list_command(page: &mut Page, region: Region, args: &[String]) {
    let applied =
        parse_list_args(args).and_then(|parsed| apply_list_args(region, page.filter_mut(region), parsed));
    if let Err(message) = applied {
        println!("{}", message);
        return;
    }
    page.reload_region(region);
    print!("{}", page.region_text(region));
}

fn handle_show_command(page: &Page, args: &[String]) {
    match args.first() {
        None => {
            for region in Region::ALL {
                print!("{}", page.region_text(region));
            }
        }
        Some(name) => match Region::parse(name) {
            Some(region) => print!("{}", page.region_text(region)),
            None => println!("Unknown region: {}. Use books, users or transactions", name),
        },
    }
}

fn parse_click(args: &[String]) -> Result<Click, String> {
    let usage = "Usage: /open <region> <id> [control]";
    let (Some(region), Some(id)) = (args.first(), args.get(1)) else {
        return Err(usage.to_string());
    };
    if args.len() > 3 {
        return Err(usage.to_string());
    }
    let region = Region::parse(region).ok_or_else(|| format!("Unknown region: {}", region))?;
    let record_id = id
        .parse::<i64>()
        .map_err(|_| format!("Record id must be a number: {}", id))?;
    let control = match args.get(2) {
        Some(name) => Some(ActionKind::parse(name).ok_or_else(|| {
            format!("Unknown control: {}. Use details, toggle or history", name)
        })?),
        None => None,
    };
    Ok(Click {
        region,
        record_id,
        control,
    })
}

fn handle_open_command(page: &mut Page, args: &[String]) -> Flow {
    let click = match parse_click(args) {
        Ok(click) => click,
        Err(message) => {
            println!("{}", message);
            return Flow::Continue;
        }
    };
    let dialog = page.click(click);
    // Toggles reload their region in place
    if click.control == Some(ActionKind::Toggle) {
        print!("{}", page.region_text(click.region));
    }
    match dialog {
        Some(dialog) => Flow::Dialog(dialog),
        None => Flow::Continue,
    }
}

/// Split `field=value` words; the value may itself contain '='
fn parse_assignments(args: &[String]) -> Result<Vec<(&str, &str)>, String> {
    args.iter()
        .map(|arg| {
            arg.split_once('=')
                .filter(|(field, _)| !field.is_empty())
                .ok_or_else(|| format!("Expected field=value, got '{}'", arg))
        })
        .collect()
}

fn parse_form_kind(name: Option<&String>) -> Result<FormKind, String> {
    let name = name.ok_or("Missing form name. Type /form to list forms")?;
    FormKind::parse(name).ok_or_else(|| format!("Unknown form: {}. Type /form to list forms", name))
}

/// Fill in fields; stops at the first bad assignment and leaves earlier ones set
fn fill_form(page: &mut Page, kind: FormKind, args: &[String]) -> Result<(), String> {
    let form = page.forms.get_mut(kind);
    for (field, value) in parse_assignments(args)? {
        form.set(field, value)?;
    }
    Ok(())
}

fn handle_form_command(page: &mut Page, args: &[String]) {
    if args.is_empty() {
        println!("Forms:");
        for form in page.forms.iter() {
            let state = if form.is_submitting() {
                "submitting".yellow().to_string()
            } else if form.is_pristine() {
                "empty".dimmed().to_string()
            } else {
                "filled in".to_string()
            };
            println!(
                "  {:<12} {:<18} {}",
                form.kind().name(),
                form.kind().title(),
                state
            );
        }
        return;
    }

    let filled = parse_form_kind(args.first()).and_then(|kind| {
        fill_form(page, kind, &args[1..])?;
        Ok(kind)
    });
    match filled {
        Ok(kind) => print!("{}", page.forms.get(kind).to_text()),
        Err(message) => println!("{}", message),
    }
}

fn handle_submit_command(page: &mut Page, args: &[String]) {
    let kind = match parse_form_kind(args.first()) {
        Ok(kind) => kind,
        Err(message) => {
            println!("{}", message);
            return;
        }
    };
    if let Err(message) = fill_form(page, kind, &args[1..]) {
        println!("{}", message);
        return;
    }

    match forms::submit(page, kind) {
        Submission::Succeeded => {}
        // Keep the fields on screen so they can be corrected
        Submission::Failed | Submission::Invalid => print!("{}", page.forms.get(kind).to_text()),
        Submission::Busy => {}
    }
}

fn handle_reset_command(page: &mut Page, args: &[String]) {
    match parse_form_kind(args.first()) {
        Ok(kind) => {
            page.forms.get_mut(kind).clear();
            println!("Cleared {}", kind.name());
        }
        Err(message) => println!("{}", message),
    }
}

fn handle_status_command(page: &mut Page) {
    match page.api.service_info() {
        Ok(info) => {
            println!("{} ({})", info.message, page.api.base_url());
            if let Some(docs) = &info.docs {
                println!("  docs: {}", docs);
            }
            for (name, path) in &info.endpoints {
                println!("  {:<14} {}", name, path);
            }
        }
        Err(e) => {
            if let Some(status) = e.status() {
                println!("Server answered HTTP {}", status);
            }
            page.notify(Level::Error, failure_message(&e));
        }
    }
    for region in Region::ALL {
        println!("  {:<14} {}", region.as_str(), page.region_summary(region));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{test_page, FakeLibrary};
    use crate::view::ViewState;

    fn words(line: &str) -> Vec<String> {
        shell_words::split(line).unwrap()
    }

    fn session(fake: &FakeLibrary) -> Session {
        let mut page = test_page(fake);
        page.load_all();
        Session::new(page, "test-session".to_string())
    }

    #[test]
    fn test_parse_list_args() {
        let parsed = parse_list_args(&words("war and peace --sort title --skip 10 --limit 5")).unwrap();
        assert_eq!(
            parsed,
            ListArgs {
                query: vec!["war".into(), "and".into(), "peace".into()],
                sort: Some("title".to_string()),
                skip: Some(10),
                limit: Some(5),
                all: false,
            }
        );
    }

    #[test]
    fn test_parse_list_args_errors() {
        assert_eq!(
            parse_list_args(&words("--limit")).unwrap_err(),
            "--limit needs a number"
        );
        assert_eq!(
            parse_list_args(&words("--skip -3")).unwrap_err(),
            "--skip must be a non-negative number"
        );
        assert!(parse_list_args(&words("--sort"))
            .unwrap_err()
            .contains("needs a key"));
        assert_eq!(
            parse_list_args(&words("--bogus")).unwrap_err(),
            "Unknown option: --bogus"
        );
    }

    #[test]
    fn test_apply_list_args_checks_sort_keys() {
        let mut filter = ListQuery::default();
        let args = parse_list_args(&words("--sort email")).unwrap();
        let err = apply_list_args(Region::Users, &mut filter, args).unwrap_err();
        assert!(err.contains("Use: name"));
        assert_eq!(filter, ListQuery::default());

        let args = parse_list_args(&words("--sort title")).unwrap();
        let err = apply_list_args(Region::Transactions, &mut filter, args).unwrap_err();
        assert_eq!(err, "transactions cannot be sorted");
    }

    #[test]
    fn test_apply_list_args_all_keeps_limit() {
        let mut filter = ListQuery {
            query: Some("dune".to_string()),
            sort_by: Some("title".to_string()),
            skip: Some(20),
            limit: Some(10),
        };
        apply_list_args(Region::Books, &mut filter, parse_list_args(&words("--all")).unwrap())
            .unwrap();
        assert_eq!(
            filter,
            ListQuery {
                limit: Some(10),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_parse_assignments() {
        let args = words("title=\"The Left Hand of Darkness\" isbn=978=0");
        let pairs = parse_assignments(&args).unwrap();
        assert_eq!(
            pairs,
            vec![("title", "The Left Hand of Darkness"), ("isbn", "978=0")]
        );
        assert!(parse_assignments(&words("title")).is_err());
        assert!(parse_assignments(&words("=value")).is_err());
    }

    #[test]
    fn test_parse_click() {
        let click = parse_click(&words("books 3 toggle")).unwrap();
        assert_eq!(
            click,
            Click {
                region: Region::Books,
                record_id: 3,
                control: Some(ActionKind::Toggle),
            }
        );
        assert_eq!(parse_click(&words("users 2")).unwrap().control, None);
        assert!(parse_click(&words("books")).is_err());
        assert!(parse_click(&words("books x")).is_err());
        assert!(parse_click(&words("shelves 1")).is_err());
        assert!(parse_click(&words("books 1 burn")).is_err());
    }

    #[test]
    fn test_exit_and_unknown_commands() {
        let fake = FakeLibrary::new();
        let mut session = session(&fake);
        assert_eq!(handle_command(&mut session, "/exit"), Flow::Exit);
        assert_eq!(handle_command(&mut session, "/nope"), Flow::Continue);
        assert_eq!(handle_command(&mut session, "hello"), Flow::Continue);
        assert_eq!(handle_command(&mut session, "/books \"unterminated"), Flow::Continue);
    }

    #[test]
    fn test_books_command_filters_the_region() {
        let fake = FakeLibrary::new();
        fake.add_book("Dune", "Herbert", "123");
        fake.add_book("Emma", "Austen", "456");
        let mut session = session(&fake);

        handle_command(&mut session, "/books Austen --sort author --limit 5");
        assert_eq!(session.page.books.state(), ViewState::Loaded(1));
        assert_eq!(session.page.book_filter.query.as_deref(), Some("Austen"));
        assert_eq!(session.page.book_filter.limit, Some(5));

        handle_command(&mut session, "/books --all");
        assert_eq!(session.page.books.state(), ViewState::Loaded(2));
    }

    #[test]
    fn test_open_returns_dialog() {
        let fake = FakeLibrary::new();
        let book = fake.add_book("Dune", "Herbert", "123");
        let mut session = session(&fake);

        let flow = handle_command(&mut session, &format!("/open books {}", book.id));
        let Flow::Dialog(dialog) = flow else {
            panic!("expected a dialog, got {:?}", flow);
        };
        assert!(dialog.lines.iter().any(|l| l.contains("Herbert")));
    }

    #[test]
    fn test_submit_keeps_fields_on_invalid_input() {
        let fake = FakeLibrary::new();
        let mut session = session(&fake);

        handle_command(&mut session, "/submit add-book title=Dune author=Herbert");
        assert!(fake.mutations().is_empty());
        let form = session.page.forms.get(FormKind::AddBook);
        assert_eq!(form.value("title"), "Dune");
        let notice = session.page.notifier.active().unwrap();
        assert_eq!(notice.level, Level::Error);

        handle_command(&mut session, "/submit add-book isbn=123");
        assert_eq!(fake.mutations().len(), 1);
        assert!(session.page.forms.get(FormKind::AddBook).is_pristine());
        assert_eq!(session.page.books.state(), ViewState::Loaded(1));
    }

    #[test]
    fn test_form_and_reset_commands() {
        let fake = FakeLibrary::new();
        let mut session = session(&fake);

        handle_command(&mut session, "/form add-user name=Ada");
        assert_eq!(session.page.forms.get(FormKind::AddUser).value("name"), "Ada");

        // unknown field leaves the form unchanged
        handle_command(&mut session, "/form add-user title=x");
        assert_eq!(session.page.forms.get(FormKind::AddUser).value("name"), "Ada");

        handle_command(&mut session, "/reset add-user");
        assert!(session.page.forms.get(FormKind::AddUser).is_pristine());
    }

    #[test]
    fn test_status_command_reports_failures_as_notice() {
        let fake = FakeLibrary::new();
        fake.respond_raw("/", 500, r#"{"detail": "Database offline"}"#);
        let mut session = session(&fake);

        handle_command(&mut session, "/status");
        let notice = session.page.notifier.active().unwrap();
        assert_eq!(notice.text, "Error: Database offline");
    }

    #[test]
    fn test_notice_dismiss_command() {
        let fake = FakeLibrary::new();
        let mut session = session(&fake);
        session.page.notify(Level::Error, "Error: boom");

        handle_command(&mut session, "/notice");
        assert!(session.page.notifier.active().is_some());
        handle_command(&mut session, "/notice dismiss");
        assert!(session.page.notifier.active().is_none());
    }

    #[test]
    fn test_print_notice_tracks_last_shown() {
        let fake = FakeLibrary::new();
        let mut session = session(&fake);
        session.page.notify(Level::Info, "hello");
        session.print_notice();
        assert_eq!(session.last_notice.as_ref().map(|n| n.text.as_str()), Some("hello"));
        handle_command(&mut session, "/notice dismiss");
        session.print_notice();
        assert!(session.last_notice.is_none());
    }
}
