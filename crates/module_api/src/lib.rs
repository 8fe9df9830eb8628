//! # Module API
//!
//! Contracts shared between the core server and the modules it hosts.
//!
//! ## Key Concepts
//!
//! - [`ModuleLoader`] - Factory that creates modules during discovery
//! - [`Module`] - Feature unit with its own [`ModuleLifecycle`]
//! - [`Server`] - Host answering capability lookups and publishing its
//!   [`ServerLifecycle`]
//! - [`CapabilityId`] - Identifier modules declare to be found by others
//! - [`StateStream`] - Replay-latest broadcast used for both lifecycles
//!
//! ## Module Lifecycle
//!
//! ```text
//! CONSTRUCTION -> PRE_INIT -> INIT -> POST_INIT -> INITIALIZED
//! ```
//!
//! A module is created by its loader in `CONSTRUCTION` and is moved forward
//! exactly one step per server phase. Only the host holding the
//! [`LoadingSecrets`] the module was built with may request a change.

pub mod capability;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod module;
pub mod secrets;
pub mod server;
pub mod stream;
pub mod types;

pub use capability::CapabilityId;
pub use error::{panic_message, LoaderError, ModuleError};
pub use lifecycle::{ModuleLifecycle, ServerLifecycle};
pub use loader::{LoaderInfo, ModuleContext, ModuleLoader};
pub use module::{cast_module, downcast_module, IntoAnyArc, Module, ModuleCore, ModuleCoreBuilder};
pub use secrets::LoadingSecrets;
pub use server::{ModuleList, Server, ServerExt};
pub use stream::{StateStream, StateSubscription};
pub use types::{ContactInformation, ServerId};

pub use async_trait::async_trait;
