// Word list helpers: case-insensitive set difference, word list files, field reordering

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

fn tab_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\t+").expect("valid regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Elements of `a` whose lowercase form does not appear in `b` (compared lowercase).
///
/// Used in both directions when diffing remote terms against a deck:
/// `a - b` gives the terms to add, `b - a` the terms to delete.
pub fn set_sub_ignore_case<'a, I, J>(a: I, b: J) -> HashSet<String>
where
    I: IntoIterator<Item = &'a String>,
    J: IntoIterator<Item = &'a String>,
{
    let b_lower: HashSet<String> = b.into_iter().map(|v| v.to_lowercase()).collect();
    a.into_iter()
        .filter(|v| !b_lower.contains(&v.to_lowercase()))
        .cloned()
        .collect()
}

/// Split one word-list line into its tab separated fields.
///
/// Runs of tabs count as one separator; whitespace inside a field is collapsed.
pub fn split_word_line(line: &str) -> Vec<String> {
    tab_runs()
        .split(line.trim())
        .map(|f| whitespace_runs().replace_all(f.trim(), " ").into_owned())
        .collect()
}

/// Read a tab separated word list file. Blank lines are skipped.
pub fn read_words_from_file(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read word list: {}", path.display()))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(split_word_line)
        .collect())
}

/// Swap the positions of named elements. Each pair must name two existing elements.
pub fn swap_positions(fields: &[&str], pairs: &[(&str, &str)]) -> Result<Vec<String>, String> {
    let mut out: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    for (first, second) in pairs {
        let idx1 = out.iter().position(|f| f == first);
        let idx2 = out.iter().position(|f| f == second);
        match (idx1, idx2) {
            (Some(i), Some(j)) => out.swap(i, j),
            _ => {
                return Err(format!(
                    "Cannot swap '{}' and '{}': both must be in {:?}",
                    first, second, fields
                ))
            }
        }
    }
    Ok(out)
}
