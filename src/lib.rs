//! Sigauth Server Library
//!
//! Wallet challenge-response authentication: one-time challenges, EIP-191
//! signature recovery, best-effort ENS enrichment and HS256 bearer credentials.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
