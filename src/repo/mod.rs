pub mod deck;
pub mod media;
pub mod note;
pub mod note_type;

pub use deck::*;
pub use media::*;
pub use note::*;
pub use note_type::*;
