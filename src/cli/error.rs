// Error handling utilities for consistent error messages and exit codes

use crate::dictionary::DICTIONARIES;
use crate::query::QUERY_APIS;
use crate::utils::fuzzy::find_near_matches;
use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

fn validate_index(value: usize, len: usize, what: &str) -> Result<usize, String> {
    if value < len {
        Ok(value)
    } else {
        Err(format!(
            "Invalid {} index: {}. Run `dict2deck dicts` to list the valid indices (0-{}).",
            what,
            value,
            len.saturating_sub(1)
        ))
    }
}

/// Validate a dictionary index against the registry
pub fn validate_dict_index(value: usize) -> Result<usize, String> {
    validate_index(value, DICTIONARIES.len(), "dictionary")
}

/// Validate a query API index against the registry
pub fn validate_api_index(value: usize) -> Result<usize, String> {
    validate_index(value, QUERY_APIS.len(), "query API")
}

/// "Not found" message with close candidates appended, if any
pub fn not_found_message(kind: &str, name: &str, candidates: &[String]) -> String {
    let near = find_near_matches(name, candidates, 3);
    if near.is_empty() {
        format!("{} '{}' not found.", kind, name)
    } else {
        let names: Vec<&str> = near.iter().map(|(n, _)| n.as_str()).collect();
        format!("{} '{}' not found. Did you mean: {}?", kind, name, names.join(", "))
    }
}
