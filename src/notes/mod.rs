pub mod manager;
pub mod templates;

pub use manager::*;
pub use templates::{CardField, FieldGroup, BACKWARDS_TEMPLATE_NAME, NORMAL_TEMPLATE_NAME};
