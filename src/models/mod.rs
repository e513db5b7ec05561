// Core data models for Dict2Deck
// These structs represent the domain entities

pub mod collection;
pub mod query_result;
pub mod word;

pub use collection::*;
pub use query_result::*;
pub use word::*;
