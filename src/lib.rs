//! Dict2Deck - sync vocabulary word books into a flashcard collection
//!
//! This library provides the core functionality for Dict2Deck, including:
//! - Settings and stored dictionary credentials
//! - Youdao and Eudic word-book clients
//! - Term lookups through the Apora API
//! - The local collection database (decks, note types, notes, media)
//! - Note type, template and note management
//! - Worker pools for fetching, querying and downloading
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use dict2deck::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod cli;
pub mod config;
pub mod db;
pub mod dictionary;
pub mod http;
pub mod models;
pub mod notes;
pub mod query;
pub mod repo;
pub mod utils;
pub mod workers;
