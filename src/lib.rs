//! Delta-chained configuration snapshots for Discord guilds.
//!
//! Each capture stores only what changed since the previous one; any
//! snapshot's full state is recovered by folding its delta chain. The
//! [`engine`] module is the public entry point; [`store`] persists chains in
//! SQLite and [`discord`] abstracts the upstream API.

pub mod cache;
pub mod cli;
pub mod config;
pub mod discord;
pub mod engine;
pub mod entity;
pub mod error;
pub mod hash;
pub mod store;
