//! The host-facing query API modules use to talk to their server.

use crate::capability::CapabilityId;
use crate::lifecycle::ServerLifecycle;
use crate::module::{cast_module, Module};
use crate::stream::StateSubscription;
use crate::types::ServerId;
use std::sync::Arc;

/// Ordered, shared list of modules returned by capability lookups.
pub type ModuleList = Arc<[Arc<dyn Module>]>;

/// The host of a set of modules.
pub trait Server: Send + Sync {
    /// Stable identifier of this server instance.
    fn id(&self) -> ServerId;

    /// Current server lifecycle state.
    fn lifecycle(&self) -> ServerLifecycle;

    /// Stream of server lifecycle states, starting with the current one.
    fn subscribe_lifecycle(&self) -> StateSubscription<ServerLifecycle>;

    /// Every module satisfying `capability`, in module-set order.
    ///
    /// Never fails; returns an empty list when nothing matches.
    fn find_modules_by(&self, capability: CapabilityId) -> ModuleList;
}

/// Typed helpers on top of [`Server`].
pub trait ServerExt: Server {
    /// Every module satisfying the capability `C`.
    ///
    /// ```rust,ignore
    /// let chat_modules = server.find_modules::<dyn ChatService>();
    /// ```
    fn find_modules<C: ?Sized + 'static>(&self) -> ModuleList {
        self.find_modules_by(CapabilityId::of::<C>())
    }

    /// Every module satisfying `C`, viewed as `C`, in module-set order.
    ///
    /// Built on the cached [`find_modules`](ServerExt::find_modules) result.
    /// Modules that declared `C` without a view (see
    /// [`ModuleCoreBuilder::capability_as`](crate::ModuleCoreBuilder::capability_as))
    /// are skipped.
    fn find_services<C: ?Sized + 'static>(&self) -> Vec<Arc<C>> {
        self.find_modules::<C>()
            .iter()
            .filter_map(cast_module::<C>)
            .collect()
    }

    /// Every module hosted by the server.
    fn all_modules(&self) -> ModuleList {
        self.find_modules::<dyn Module>()
    }
}

impl<S: Server + ?Sized> ServerExt for S {}
