//! Test fixtures shared by downstream crates.

pub mod database;

pub use database::TempSqliteDatabase;
