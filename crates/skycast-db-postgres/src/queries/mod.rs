//! SQL query implementations.

pub mod forecast;
