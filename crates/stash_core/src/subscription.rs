//! Subscription handles
//!
//! Every subscribe call hands back a [`SubscriptionHandle`]. The handle only
//! holds a weak reference to the container it came from, so keeping a handle
//! around never keeps a container alive, and unsubscribing after the container
//! is gone is a no-op.

use std::fmt;
use std::sync::Weak;

/// Unique identifier for a subscriber within one container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Convert to raw u64
    pub fn to_raw(&self) -> u64 {
        self.0
    }
}

/// Subscriber bookkeeping as seen from a handle
///
/// Implemented by the shared container core so that handles can stay
/// independent of the container's value type.
pub(crate) trait Registry: Send + Sync {
    /// Remove the subscriber, returning whether it was still registered
    fn remove(&self, id: SubscriptionId) -> bool;

    /// Check whether the subscriber is registered
    fn contains(&self, id: SubscriptionId) -> bool;
}

/// Handle for unsubscribing from container updates
///
/// Unsubscribing is idempotent: calling [`unsubscribe`](Self::unsubscribe)
/// twice, on a clone, or after the container was dropped does nothing.
#[derive(Clone)]
pub struct SubscriptionHandle {
    id: Option<SubscriptionId>,
    owner: Option<Weak<dyn Registry>>,
}

impl SubscriptionHandle {
    pub(crate) fn new(id: SubscriptionId, owner: Weak<dyn Registry>) -> Self {
        Self {
            id: Some(id),
            owner: Some(owner),
        }
    }

    /// A handle that is not attached to anything
    ///
    /// Used by subscribe functions that decide not to subscribe at all, e.g.
    /// when rendering without interactivity.
    pub fn detached() -> Self {
        Self {
            id: None,
            owner: None,
        }
    }

    /// The subscriber id, if attached
    pub fn id(&self) -> Option<SubscriptionId> {
        self.id
    }

    /// Remove the subscriber from its container
    pub fn unsubscribe(&self) {
        let (Some(id), Some(owner)) = (self.id, self.owner.as_ref()) else {
            return;
        };

        match owner.upgrade() {
            Some(owner) => {
                if owner.remove(id) {
                    tracing::trace!(subscription = id.to_raw(), "unsubscribed");
                }
            }
            None => {
                tracing::trace!(
                    subscription = id.to_raw(),
                    "unsubscribe after container was dropped"
                );
            }
        }
    }

    /// Check whether the subscriber is still registered
    pub fn is_active(&self) -> bool {
        match (self.id, self.owner.as_ref().and_then(Weak::upgrade)) {
            (Some(id), Some(owner)) => owner.contains(id),
            _ => false,
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
