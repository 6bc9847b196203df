//! wildrank-server: data-collection backend for the WildRank scouting app
//!
//! Stores uploaded scouting records and photos as flat files, moves them
//! between instances as zip archives, and consolidates CSV exports into a
//! spreadsheet.

pub mod config;
pub mod merge;
pub mod server;
pub mod store;
pub mod transfer;
