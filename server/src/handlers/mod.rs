//! Request handlers for the document collection.

mod documents;

pub use documents::*;
