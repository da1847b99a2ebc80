//! Form validation.
//!
//! A [`Schema`] maps form values to per-field messages. [`RuleSchema`]
//! offers a fluent builder for the common rules; any closure over
//! [`FieldValues`](datagrid_data::FieldValues) works too.
//!
//! # Example
//!
//! ```ignore
//! use datagrid::validation::RuleSchema;
//!
//! let schema = RuleSchema::builder()
//!     .field("name")
//!         .required("Name is required")
//!         .min_length(2, "Name must be at least 2 characters")
//!     .field("email")
//!         .email("Please enter a valid email")
//!     .build();
//! ```

mod result;
mod rules;
mod schema;

pub use result::{FieldError, ValidationResult};
pub use rules::{FieldBuilder, RuleSchema, SchemaBuilder};
pub use schema::{AcceptAll, ParseError, Schema, parse_values};
