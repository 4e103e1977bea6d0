//! Subscriber kinds
//!
//! A container keeps two kinds of subscribers side by side:
//!
//! - **Plain** subscribers see every whole-value change. The gate is value
//!   identity (`Arc::ptr_eq`), never deep equality.
//! - **Selected** subscribers project the value through a selector and only
//!   hear about changes to the projection, as decided by an equality function.

use std::sync::Arc;

/// Callback invoked with the new value of a container
pub type Listener<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

/// Equality check used to decide whether a selected value changed
pub type EqualityFn<P> = Arc<dyn Fn(&P, &P) -> bool + Send + Sync>;

/// A registered subscriber
pub(crate) enum Subscriber<T> {
    /// Called with the whole value whenever its identity changes
    Plain(Listener<T>),
    /// Called with the selected value whenever the selection changes
    Selected(Box<dyn SelectedEntry<T>>),
}

impl<T> Subscriber<T> {
    /// Notify about a `prev -> next` transition
    ///
    /// Returns whether the callback fired.
    pub(crate) fn notify(&self, prev: &Arc<T>, next: &Arc<T>) -> bool {
        match self {
            Subscriber::Plain(listener) => {
                if Arc::ptr_eq(prev, next) {
                    return false;
                }
                listener(next);
                true
            }
            Subscriber::Selected(entry) => entry.notify(prev, next),
        }
    }

    /// Check whether this is the given plain listener
    pub(crate) fn is_listener(&self, other: &Listener<T>) -> bool {
        match self {
            Subscriber::Plain(listener) => Arc::ptr_eq(listener, other),
            Subscriber::Selected(_) => false,
        }
    }
}

/// Type-erased selected subscriber
///
/// Hides the projection type `P` so that selected entries with different
/// projections can share one subscriber map.
pub(crate) trait SelectedEntry<T>: Send + Sync {
    fn notify(&self, prev: &T, next: &T) -> bool;
}

/// Selector, callback and equality check for one selected subscription
pub(crate) struct Selection<T, P> {
    selector: Box<dyn Fn(&T) -> P + Send + Sync>,
    callback: Box<dyn Fn(P) + Send + Sync>,
    is_equal: EqualityFn<P>,
}

impl<T, P> Selection<T, P> {
    pub(crate) fn new<S, F>(selector: S, callback: F, is_equal: EqualityFn<P>) -> Self
    where
        S: Fn(&T) -> P + Send + Sync + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        Self {
            selector: Box::new(selector),
            callback: Box::new(callback),
            is_equal,
        }
    }
}

impl<T, P> SelectedEntry<T> for Selection<T, P>
where
    T: Send + Sync,
    P: Send + Sync,
{
    fn notify(&self, prev: &T, next: &T) -> bool {
        let selected = (self.selector)(next);
        let selected_prev = (self.selector)(prev);

        if (self.is_equal)(&selected_prev, &selected) {
            return false;
        }

        (self.callback)(selected);
        true
    }
}

/// Default equality for selected values
pub(crate) fn partial_eq<P: PartialEq>() -> EqualityFn<P> {
    Arc::new(|a: &P, b: &P| a == b)
}
