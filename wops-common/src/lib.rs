//! # WOPS Common Library
//!
//! Shared code for the warehouse operations service:
//! - Error taxonomy and lookup outcomes
//! - Configuration loading (CLI → ENV → TOML → defaults)
//! - Row Store Gateway (spreadsheet REST client and in-memory store)
//! - Column alias resolution and typed record adapters
//! - Field normalization (shift, status, locale numbers, dates)

pub mod config;
pub mod error;
pub mod normalize;
pub mod records;
pub mod store;
pub mod time;

pub use error::{Error, Outcome, Result, RowError};
pub use normalize::{ShiftLabel, StatusLabel};
