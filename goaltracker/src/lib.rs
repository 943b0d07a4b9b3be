//! Goal tracker library
//!
//! This library exposes the core functionality of the goal tracker for the
//! command-line binary and for testing.

pub mod app;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod remote;
pub mod repository;
pub mod services;
