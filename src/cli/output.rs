// Output formatting for word lists, reports and settings

use crate::config::AppConfig;
use crate::dictionary::DICTIONARIES;
use crate::query::QUERY_APIS;
use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";
const COLUMN_GAP: usize = 2;

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate, falling back to the COLUMNS environment
/// variable and then to 120.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Lay items out in as many left-aligned columns as fit in `width`
pub fn format_columns(items: &[String], width: usize) -> String {
    if items.is_empty() {
        return String::new();
    }
    let cell = items.iter().map(|s| s.chars().count()).max().unwrap_or(0) + COLUMN_GAP;
    let per_row = (width / cell).max(1);

    let mut out = String::new();
    for row in items.chunks(per_row) {
        let line: String = row
            .iter()
            .map(|item| format!("{:<w$}", item, w = cell))
            .collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Titled word list, e.g. "New words (3):" followed by the words in columns
pub fn format_word_list(title: &str, words: &[String]) -> String {
    let tty = is_tty();
    let mut out = format!("{} ({}):\n", bold_if_tty(title, tty), words.len());
    out.push_str(&format_columns(words, get_terminal_width()));
    out
}

pub fn format_sync_report(added: usize, deleted: usize) -> String {
    format!("Added: {}, Deleted: {}", added, deleted)
}

/// Settings as aligned `key  value` lines, secrets masked
pub fn format_config(config: &AppConfig) -> String {
    let value = match serde_json::to_value(config.masked()) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => return String::new(),
    };
    let width = value.keys().map(|k| k.len()).max().unwrap_or(0);

    let mut out = String::new();
    for (key, val) in &value {
        let rendered = match val {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_str(&format!("{:<w$}  {}\n", key, rendered, w = width));
    }
    out
}

/// Registered dictionaries and query APIs with their indices; the selected
/// ones are marked with `*`
pub fn format_registries(config: &AppConfig) -> String {
    let tty = is_tty();
    let mark = |selected: bool| if selected { "*" } else { " " };

    let mut out = format!("{}\n", bold_if_tty("Dictionaries:", tty));
    for (i, entry) in DICTIONARIES.iter().enumerate() {
        out.push_str(&format!("{} {}  {}\n", mark(i == config.selected_dict), i, entry.name));
    }
    out.push_str(&format!("{}\n", bold_if_tty("Query APIs:", tty)));
    for (i, entry) in QUERY_APIS.iter().enumerate() {
        out.push_str(&format!("{} {}  {}\n", mark(i == config.selected_api), i, entry.name));
    }
    out
}

/// Progress counter printed to stderr when attached to a terminal
pub struct Progress {
    label: String,
    done: AtomicUsize,
    total: AtomicUsize,
    visible: bool,
}

impl Progress {
    pub fn new(label: &str, total: usize) -> Self {
        Self {
            label: label.to_string(),
            done: AtomicUsize::new(0),
            total: AtomicUsize::new(total),
            visible: std::io::stderr().is_terminal(),
        }
    }

    pub fn add_total(&self, n: usize) {
        self.total.fetch_add(n, Ordering::SeqCst);
        self.draw();
    }

    pub fn tick(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
        self.draw();
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    fn draw(&self) {
        if !self.visible {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "\r{} [{}/{}]",
            self.label,
            self.done.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst)
        );
        let _ = stderr.flush();
    }

    pub fn finish(&self) {
        if self.visible {
            eprintln!();
        }
    }
}
