//! # Core Server - Module Host Bootstrap
//!
//! The deepest layer of a pluggable server. It owns no features of its own;
//! everything is contributed by modules produced by [`ModuleLoader`]s.
//!
//! ## Responsibilities
//!
//! * **Discovery** - Asks every registered loader for its modules, in order
//! * **Phase advance** - Moves all modules through `PRE_INIT`, `INIT` and
//!   `POST_INIT` in lockstep with the server's own lifecycle
//! * **Capability lookup** - Lets modules find each other, with memoized results
//! * **Failure isolation** - A failing module is logged and reported but never
//!   stops the others
//!
//! ## Server Lifecycle
//!
//! ```text
//! CORE_INITIALIZATION -> MODULE_PRE_INIT -> MODULE_INIT -> MODULE_POST_INIT -> RUNNING
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = LoaderRegistry::new().with(GreeterLoader::new());
//! let server = CoreServer::new(registry, CoreConfig::default()).await?;
//! let report = server.start().await?;
//! for failure in &report.failures {
//!     eprintln!("{}", failure.diagnostic);
//! }
//! ```
//!
//! [`ModuleLoader`]: module_api::ModuleLoader

mod cache;
pub mod config;
pub mod error;
pub mod phases;
pub mod registry;
pub mod server;
pub mod status;

pub use config::{CoreConfig, FailurePolicy};
pub use error::CoreError;
pub use phases::{DiagnosticError, InitializationReport, PhaseFailure, INITIALIZATION_PHASES};
pub use registry::LoaderRegistry;
pub use server::CoreServer;
pub use status::{ModuleStatus, ServerStatus};
