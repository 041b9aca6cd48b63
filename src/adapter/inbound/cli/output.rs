//! Terminal output for the operator CLI.
//!
//! Handlers print through these helpers so `--json` and `--quiet` behave the
//! same everywhere. In JSON mode every line is an object with a `type` and a
//! `payload`; command results are a single object from [`json_output`].

use std::fmt::Display;
use std::sync::{OnceLock, RwLock};

use owo_colors::{OwoColorize, Stream};
use serde_json::{json, Value};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output flags taken from the global CLI arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit JSON objects instead of text.
    pub json: bool,
    /// Print only warnings and command results.
    pub quiet: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    const fn mode(self) -> Mode {
        match (self.json, self.quiet) {
            (true, _) => Mode::Json,
            (false, true) => Mode::Quiet,
            (false, false) => Mode::Human,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Human,
    Quiet,
    Json,
}

static OUTPUT: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn cell() -> &'static RwLock<OutputConfig> {
    OUTPUT.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn mode() -> Mode {
    let config = match cell().read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    };
    config.mode()
}

fn emit(kind: &str, payload: Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

fn paint(value: impl Display, style: fn(&String) -> String) -> String {
    let value = value.to_string();
    if mode() == Mode::Json {
        return value;
    }
    value
        .if_supports_color(Stream::Stdout, |v| style(v))
        .to_string()
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    match cell().write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

#[must_use]
pub fn is_json() -> bool {
    mode() == Mode::Json
}

/// Print the name and version line.
pub fn header(version: &str) {
    if mode() != Mode::Human {
        return;
    }
    println!(
        "{} {}\n",
        "arbfill".if_supports_color(Stream::Stdout, |v| v.bold()),
        version.if_supports_color(Stream::Stdout, |v| v.dimmed())
    );
}

/// Print `label` and `value` in aligned columns.
pub fn field(label: &str, value: impl Display) {
    match mode() {
        Mode::Json => emit(
            "field",
            json!({ "label": label, "value": value.to_string() }),
        ),
        Mode::Human => println!(
            "  {:<14} {}",
            label.if_supports_color(Stream::Stdout, |v| v.dimmed()),
            value
        ),
        Mode::Quiet => {}
    }
}

pub fn success(message: &str) {
    match mode() {
        Mode::Json => emit("success", json!({ "message": message })),
        Mode::Human => println!(
            "  {} {message}",
            "✓".if_supports_color(Stream::Stdout, |v| v.green())
        ),
        Mode::Quiet => {}
    }
}

/// Print a warning. Quiet mode still shows it.
pub fn warning(message: &str) {
    match mode() {
        Mode::Json => emit("warning", json!({ "message": message })),
        Mode::Human | Mode::Quiet => println!(
            "  {} {message}",
            "⚠".if_supports_color(Stream::Stdout, |v| v.yellow())
        ),
    }
}

pub fn section(title: &str) {
    match mode() {
        Mode::Json => emit("section", json!({ "title": title })),
        Mode::Human => println!(
            "\n{}",
            title.if_supports_color(Stream::Stdout, |v| v.bold())
        ),
        Mode::Quiet => {}
    }
}

pub fn note(message: &str) {
    match mode() {
        Mode::Json => emit("note", json!({ "message": message })),
        Mode::Human => println!(
            "  {}",
            message.if_supports_color(Stream::Stdout, |v| v.dimmed())
        ),
        Mode::Quiet => {}
    }
}

/// Print rows as an indented rounded table. Human mode only.
pub fn table<T: Tabled>(rows: impl IntoIterator<Item = T>) {
    if mode() != Mode::Human {
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    for line in table.to_string().lines() {
        println!("  {line}");
    }
}

/// Green when `amount >= 0`, red otherwise.
pub fn signed(amount: i64, text: impl Display) -> String {
    if amount >= 0 {
        paint(text, |v| v.green().to_string())
    } else {
        negative(text)
    }
}

pub fn negative(value: impl Display) -> String {
    paint(value, |v| v.red().to_string())
}

pub fn highlight(value: impl Display) -> String {
    paint(value, |v| v.cyan().to_string())
}

pub fn muted(value: impl Display) -> String {
    paint(value, |v| v.dimmed().to_string())
}

/// Print a command result object.
pub fn json_output(value: Value) {
    println!("{value}");
}
