//! Error types

mod source;

pub use source::*;
