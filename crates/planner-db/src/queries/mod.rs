//! Query functions, one module per table.

pub mod records;
