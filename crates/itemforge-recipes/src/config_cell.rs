//! Notifying configuration cells.
//!
//! A `ConfigCell` holds one user-editable value next to its declared default.
//! Setting a different value notifies every observer synchronously, in
//! subscription order. Setting the current value again does nothing.

use std::fmt;

/// Observer callback for cell changes.
pub type CellObserver<T> = Box<dyn FnMut(&T)>;

/// Handle returned by `ConfigCell::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u32);

/// A user-editable value with change notification.
pub struct ConfigCell<T> {
    /// Current value.
    value: T,
    /// Declared default.
    default: T,
    /// Observers in subscription order.
    observers: Vec<(SubscriptionId, CellObserver<T>)>,
    /// Next subscription handle.
    next_subscription: u32,
}

impl<T: fmt::Debug> fmt::Debug for ConfigCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigCell")
            .field("value", &self.value)
            .field("default", &self.default)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq> ConfigCell<T> {
    /// Cell holding its default.
    #[must_use]
    pub fn new(default: T) -> Self {
        Self::with_value(default.clone(), default)
    }

    /// Cell seeded with a persisted value.
    #[must_use]
    pub fn with_value(value: T, default: T) -> Self {
        Self {
            value,
            default,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Declared default.
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Whether the value differs from the default.
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.value != self.default
    }

    /// Set the value. Returns `false` and notifies nobody when unchanged.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        for (_, observer) in &mut self.observers {
            observer(&self.value);
        }
        true
    }

    /// Restore the default value.
    pub fn reset(&mut self) -> bool {
        let default = self.default.clone();
        self.set(default)
    }

    /// Register an observer called after every change.
    pub fn subscribe(&mut self, observer: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_new_holds_default() {
        let cell = ConfigCell::new(3_u32);
        assert_eq!(*cell.get(), 3);
        assert!(!cell.is_modified());
    }

    #[test]
    fn test_set_notifies() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut cell = ConfigCell::new(String::from("Wood:1"));
        let sink = Rc::clone(&seen);
        cell.subscribe(move |v: &String| sink.borrow_mut().push(v.clone()));

        assert!(cell.set("Wood:2".to_string()));
        assert_eq!(seen.borrow().as_slice(), ["Wood:2".to_string()]);
        assert!(cell.is_modified());
    }

    #[test]
    fn test_set_same_value_is_noop() {
        let calls = Rc::new(RefCell::new(0));
        let mut cell = ConfigCell::new(1_u32);
        let counter = Rc::clone(&calls);
        cell.subscribe(move |_| *counter.borrow_mut() += 1);

        assert!(!cell.set(1));
        assert!(cell.set(2));
        assert!(!cell.set(2));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let calls = Rc::new(RefCell::new(0));
        let mut cell = ConfigCell::new(false);
        let counter = Rc::clone(&calls);
        let id = cell.subscribe(move |_| *counter.borrow_mut() += 1);

        assert!(cell.unsubscribe(id));
        assert!(!cell.unsubscribe(id));
        cell.set(true);
        assert_eq!(*calls.borrow(), 0);
        assert_eq!(cell.observer_count(), 0);
    }

    #[test]
    fn test_reset() {
        let mut cell = ConfigCell::with_value(5_u32, 1);
        assert!(cell.is_modified());
        assert!(cell.reset());
        assert_eq!(*cell.get(), 1);
        assert!(!cell.reset());
    }
}
