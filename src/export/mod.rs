pub mod table;

pub use table::{to_table, write_table};
