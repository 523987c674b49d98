//! Marquee - movie catalogue JSON API
//!
//! This crate implements a small CRUD service over movie records stored in
//! SQLite. Every request passes through a per-client token bucket rate
//! limiter keyed by the caller's network address.

pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod movies;
pub mod ratelimit;
