//! Storage module for database access and schema.

pub mod database;
pub mod schema;

pub use database::{is_unique_violation, Database, DatabaseError};
