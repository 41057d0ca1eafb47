//! # Folio
//!
//! Command-line front end over `folio-core`. File I/O and configuration
//! live here; the core crate stays pure.

pub mod cli;
pub mod config;
