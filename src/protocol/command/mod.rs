pub mod column_definition;
pub mod query;
pub mod resultset;
pub mod utility;

pub use column_definition::{ColumnDefinitionBytes, ColumnDefinitionTail};

#[cfg(test)]
mod column_definition_test;
