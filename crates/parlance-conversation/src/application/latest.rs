//! Always-current holder for a replaceable value.
//!
//! Long-lived subscriptions (the event router, queue tasks) read the holder
//! at call time, so replacing the value takes effect on the next call without
//! resubscribing.

use std::sync::{Arc, PoisonError, RwLock};

/// A shared cell that always yields the most recently stored value.
#[derive(Debug)]
pub struct Latest<T: ?Sized> {
    current: RwLock<Arc<T>>,
}

impl<T: ?Sized> Latest<T> {
    /// Creates a cell holding `value`.
    #[must_use]
    pub fn new(value: Arc<T>) -> Self {
        Self {
            current: RwLock::new(value),
        }
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the current value and returns the previous one.
    pub fn replace(&self, value: Arc<T>) -> Arc<T> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Fixed(&'static str);

    impl Greeter for Fixed {
        fn greet(&self) -> String {
            self.0.to_owned()
        }
    }

    #[test]
    fn test_readers_observe_replacement_without_resubscribing() {
        // Arrange
        let first: Arc<dyn Greeter> = Arc::new(Fixed("first"));
        let cell = Arc::new(Latest::new(first));
        let subscription = {
            let cell = Arc::clone(&cell);
            move || cell.get().greet()
        };
        assert_eq!(subscription(), "first");

        // Act
        let previous = cell.replace(Arc::new(Fixed("second")));

        // Assert
        assert_eq!(previous.greet(), "first");
        assert_eq!(subscription(), "second");
    }
}
