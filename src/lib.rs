//! Turn natural-language requests into SQL against a live relational schema.
//!
//! The pipeline introspects the store ([`schema::introspect`]), renders the schema as annotated
//! text ([`schema::format`]), asks a generative provider for a statement and falls back to a
//! deterministic heuristic ([`compose`]) whenever the provider is unavailable
//! ([`generate`]). Generated statements only reach the store through a read-only gate
//! ([`execute`]).

pub mod api;
pub mod compose;
pub mod config;
pub mod error;
pub mod execute;
pub mod generate;
pub mod schema;
pub mod store;

pub use querymind_sqlparse as sqlparse;
pub use sqlx;
