//! Remote backend
//!
//! Thin clients for the hosted services:
//! - `client`: the Postgres-over-HTTP persistence adapter
//! - `schema`: idempotent provisioning of the remote schema
//! - `prompts`: the prompt registration / execution endpoints

pub mod client;
pub mod prompts;
pub mod schema;

pub use client::{DisconnectedExecutor, HttpPersistence, QueryExecutor, RemoteCredentials};
pub use prompts::{PromptClient, ReturnType};
pub use schema::initialize_remote;
