pub mod clean;
mod parser;
pub mod types;

pub use parser::{ParseError, parse_tables, select_table};
pub use types::{Cell, Table, TableSelector};
