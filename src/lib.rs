pub mod config;
pub mod errors;
pub mod http;
pub mod logging;
pub mod preview;
