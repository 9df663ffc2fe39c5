//! HTTP surfaces: the management API and the per-preview static server.

pub mod api;
pub mod server;
pub mod static_site;
