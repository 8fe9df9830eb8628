//! Capability identifiers used to look modules up by what they provide.
//!
//! A capability is any `'static` type, usually a trait object type such as
//! `dyn ChatService`. Modules declare the capabilities they satisfy when their
//! [`ModuleCore`](crate::ModuleCore) is built; the host answers lookups by
//! comparing identifiers.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier of a capability type.
///
/// Equality and hashing only consider the [`TypeId`]; the type name is kept
/// for diagnostics.
#[derive(Clone, Copy)]
pub struct CapabilityId {
    type_id: TypeId,
    name: &'static str,
}

impl CapabilityId {
    /// Identifier of the capability `C`.
    ///
    /// ```rust
    /// use module_api::CapabilityId;
    ///
    /// trait Chat {}
    /// assert_eq!(CapabilityId::of::<dyn Chat>(), CapabilityId::of::<dyn Chat>());
    /// ```
    pub fn of<C: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified name of the capability type.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for CapabilityId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CapabilityId {}

impl Hash for CapabilityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapabilityId").field(&self.name).finish()
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    trait Alpha {}
    trait Beta {}

    #[test]
    fn test_identity_follows_type() {
        assert_eq!(CapabilityId::of::<dyn Alpha>(), CapabilityId::of::<dyn Alpha>());
        assert_ne!(CapabilityId::of::<dyn Alpha>(), CapabilityId::of::<dyn Beta>());

        let set: HashSet<_> = [
            CapabilityId::of::<dyn Alpha>(),
            CapabilityId::of::<dyn Beta>(),
            CapabilityId::of::<dyn Alpha>(),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_name_is_kept_for_diagnostics() {
        assert!(CapabilityId::of::<dyn Alpha>().name().contains("Alpha"));
        assert!(format!("{:?}", CapabilityId::of::<u32>()).contains("u32"));
    }
}
