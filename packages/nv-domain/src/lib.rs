pub mod catalog;
pub mod document;
pub mod feature;
pub mod matcher;
pub mod record;

mod error;

pub use error::{Error, Result};
