//! Update arguments
//!
//! An update is either a literal replacement value or a transform of the
//! previous value. Encoding it as an enum makes "neither shape" impossible.

use std::fmt;
use std::sync::Arc;

use crate::container::StateContainer;

/// Transform from the previous value to the next one
pub type Transform<T> = Box<dyn FnOnce(&T) -> Arc<T> + Send>;

/// A literal value or a transform of the previous value
pub enum SetState<T> {
    /// Replace the value outright
    Replace(Arc<T>),
    /// Compute the next value from the previous one
    Transform(Transform<T>),
}

impl<T: 'static> SetState<T> {
    /// Replace with a literal value
    pub fn replace(value: impl Into<Arc<T>>) -> Self {
        SetState::Replace(value.into())
    }

    /// Compute the next value from the previous one
    pub fn transform<F, R>(f: F) -> Self
    where
        F: FnOnce(&T) -> R + Send + 'static,
        R: Into<Arc<T>>,
    {
        SetState::Transform(Box::new(move |prev: &T| f(prev).into()))
    }

    /// Resolve against the previous value
    ///
    /// `prev` is only read for transforms.
    pub fn resolve(self, prev: impl FnOnce() -> Arc<T>) -> Arc<T> {
        match self {
            SetState::Replace(value) => value,
            SetState::Transform(f) => f(&prev()),
        }
    }

    /// Resolve against the container's current value and apply it
    pub fn apply_to<C>(self, container: &C) -> C::Completion
    where
        C: StateContainer<Value = T>,
    {
        let next = self.resolve(|| container.get_value());
        container.set_value(next)
    }
}

impl<T> From<T> for SetState<T> {
    fn from(value: T) -> Self {
        SetState::Replace(Arc::new(value))
    }
}

impl<T: fmt::Debug> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetState::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            SetState::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_container;

    #[test]
    fn test_replace_ignores_prev() {
        let next = SetState::from(7).resolve(|| panic!("prev should not be read"));
        assert_eq!(*next, 7);
    }

    #[test]
    fn test_transform_reads_prev() {
        let next = SetState::transform(|v: &i32| v + 1).resolve(|| Arc::new(42));
        assert_eq!(*next, 43);
    }

    #[test]
    fn test_apply_to_container() {
        let container = create_container(String::from("a"));

        SetState::transform(|s: &String| format!("{s}b")).apply_to(&container);
        assert_eq!(container.get_value().as_str(), "ab");

        let current = container.get_value();
        SetState::replace(current.clone()).apply_to(&container);
        assert!(Arc::ptr_eq(&container.get_value(), &current));
    }
}
