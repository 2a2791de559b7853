//! HTTP API: thin inbound surface over the authorization engine.
//!
//! The web layer proper (CRUD views for vendors, guests, schedules) lives
//! elsewhere; this crate exposes only the authorization contract: an
//! `authorize` endpoint and the administrative `force-sync` trigger.

pub mod app;
pub mod config;
pub mod middleware;
