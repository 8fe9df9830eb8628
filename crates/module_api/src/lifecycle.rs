//! Lifecycle state machines for modules and for the server itself.
//!
//! Both enums are ordered, forward-only sequences. A module moves exactly one
//! step per phase-change request; the server moves one notch per global phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Progress of a single module through its initialization.
///
/// ```text
/// CONSTRUCTION -> PRE_INIT -> INIT -> POST_INIT -> INITIALIZED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleLifecycle {
    /// The module object exists but no phase has been applied yet
    Construction,
    /// Handler registration and other wiring that must precede init
    PreInit,
    /// Main initialization
    Init,
    /// Work that depends on every other module being initialized
    PostInit,
    /// Terminal state
    Initialized,
}

impl ModuleLifecycle {
    /// Every state in order.
    pub const ALL: [ModuleLifecycle; 5] = [
        ModuleLifecycle::Construction,
        ModuleLifecycle::PreInit,
        ModuleLifecycle::Init,
        ModuleLifecycle::PostInit,
        ModuleLifecycle::Initialized,
    ];

    /// The state immediately after this one, or `None` for the terminal state.
    pub const fn next(self) -> Option<ModuleLifecycle> {
        match self {
            ModuleLifecycle::Construction => Some(ModuleLifecycle::PreInit),
            ModuleLifecycle::PreInit => Some(ModuleLifecycle::Init),
            ModuleLifecycle::Init => Some(ModuleLifecycle::PostInit),
            ModuleLifecycle::PostInit => Some(ModuleLifecycle::Initialized),
            ModuleLifecycle::Initialized => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ModuleLifecycle::Construction => "CONSTRUCTION",
            ModuleLifecycle::PreInit => "PRE_INIT",
            ModuleLifecycle::Init => "INIT",
            ModuleLifecycle::PostInit => "POST_INIT",
            ModuleLifecycle::Initialized => "INITIALIZED",
        }
    }
}

impl Default for ModuleLifecycle {
    fn default() -> Self {
        ModuleLifecycle::Construction
    }
}

impl fmt::Display for ModuleLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse progress of the host.
///
/// Published by the core server only, never reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerLifecycle {
    /// Discovery and construction of modules
    CoreInitialization,
    /// Modules are being moved to `PRE_INIT`
    ModulePreInit,
    /// Modules are being moved to `INIT`
    ModuleInit,
    /// Modules are being moved to `POST_INIT`
    ModulePostInit,
    /// Initialization finished and the host declared itself running
    Running,
}

impl ServerLifecycle {
    /// Every state in order.
    pub const ALL: [ServerLifecycle; 5] = [
        ServerLifecycle::CoreInitialization,
        ServerLifecycle::ModulePreInit,
        ServerLifecycle::ModuleInit,
        ServerLifecycle::ModulePostInit,
        ServerLifecycle::Running,
    ];

    /// The state immediately after this one, or `None` once running.
    pub const fn next(self) -> Option<ServerLifecycle> {
        match self {
            ServerLifecycle::CoreInitialization => Some(ServerLifecycle::ModulePreInit),
            ServerLifecycle::ModulePreInit => Some(ServerLifecycle::ModuleInit),
            ServerLifecycle::ModuleInit => Some(ServerLifecycle::ModulePostInit),
            ServerLifecycle::ModulePostInit => Some(ServerLifecycle::Running),
            ServerLifecycle::Running => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ServerLifecycle::CoreInitialization => "CORE_INITIALIZATION",
            ServerLifecycle::ModulePreInit => "MODULE_PRE_INIT",
            ServerLifecycle::ModuleInit => "MODULE_INIT",
            ServerLifecycle::ModulePostInit => "MODULE_POST_INIT",
            ServerLifecycle::Running => "RUNNING",
        }
    }
}

impl Default for ServerLifecycle {
    fn default() -> Self {
        ServerLifecycle::CoreInitialization
    }
}

impl fmt::Display for ServerLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_next_walks_the_whole_sequence() {
        let mut walked = vec![ModuleLifecycle::Construction];
        while let Some(next) = walked.last().and_then(|s| s.next()) {
            walked.push(next);
        }
        assert_eq!(walked, ModuleLifecycle::ALL.to_vec());
        assert!(ModuleLifecycle::Initialized.is_terminal());
        assert!(!ModuleLifecycle::PostInit.is_terminal());
    }

    #[test]
    fn test_module_states_are_ordered() {
        for pair in ModuleLifecycle::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
    }

    #[test]
    fn test_server_next_walks_the_whole_sequence() {
        for pair in ServerLifecycle::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert_eq!(ServerLifecycle::Running.next(), None);
    }

    #[test]
    fn test_display_uses_screaming_names() {
        assert_eq!(ModuleLifecycle::PreInit.to_string(), "PRE_INIT");
        assert_eq!(ServerLifecycle::CoreInitialization.to_string(), "CORE_INITIALIZATION");
        assert_eq!(ModuleLifecycle::default(), ModuleLifecycle::Construction);
        assert_eq!(ServerLifecycle::default(), ServerLifecycle::CoreInitialization);
    }
}
