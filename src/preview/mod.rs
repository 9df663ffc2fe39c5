//! Preview servers — one isolated static-file HTTP server per website.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐  HTTP  ┌──────────────────────────────────────────────────┐
//! │  Client  │ ─────> │  http::api  (axum Router, ApiError)              │
//! └──────────┘        │     └─ facade.rs  (PreviewApi, *Result types)    │
//!                     │            │                                     │
//!                     │            v                                     │
//!                     │  registry.rs  (PreviewRegistry, one lock)        │
//!                     │     │                 │                          │
//!                     │     v                 v                          │
//!                     │  ports.rs          process.rs                    │
//!                     │  (PortAllocator)   (PreviewProcess, child group) │
//!                     │                                                  │
//!                     │  sweeper.rs  (Sweeper) ── stop() ──> registry    │
//!                     │  manager.rs  (PreviewManager: start / shutdown)  │
//!                     └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module   | Responsibility                                         |
//! |----------|--------------------------------------------------------|
//! | `models` | `PreviewSnapshot`, the only view callers ever receive  |
//!
//! ## Lifecycle of one preview
//!
//! 1. `PreviewApi::start_preview()` → `PreviewRegistry::create_or_get()`.
//! 2. Under the registry lock: reuse a running entry, or purge a dead one,
//!    allocate a port, spawn the server in its own process group and wait
//!    out the startup grace period.
//! 3. Status queries touch the entry; the sweeper stops entries idle past
//!    their timeout or whose process exited.
//! 4. `PreviewManager::shutdown()` cancels the sweeper and stops the rest.

pub mod facade;
pub mod manager;
pub mod models;
pub mod ports;
pub mod process;
pub mod registry;
pub mod sweeper;

pub use facade::{ListResult, PreviewApi, StartResult, StatusResult, StopResult};
pub use manager::PreviewManager;
pub use models::PreviewSnapshot;
pub use ports::PortAllocator;
pub use process::{PreviewProcess, ServerCommand};
pub use registry::{PreviewRegistry, RegistrySettings};
pub use sweeper::Sweeper;
