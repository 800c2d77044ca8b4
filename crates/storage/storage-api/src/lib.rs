//! The engine context layer: wires the catalog, buffer pool and heap files
//! together behind one explicitly constructed object, with configuration
//! and logging setup for embedders.

pub mod catalog;
pub mod config;
pub mod database;
pub mod logging;
pub mod transaction;
