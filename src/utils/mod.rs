pub mod fuzzy;
pub mod media;
pub mod words;

pub use media::*;
pub use words::*;
