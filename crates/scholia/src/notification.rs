//! At most one visible notification at a time.
//!
//! Showing a new notification dismisses whatever was showing before it. The manager only keeps
//! a dismiss handle; how a notification is drawn is up to the caller.

use std::sync::Mutex;

/// Closes a notification that is currently shown.
pub type DismissHandle = Box<dyn FnOnce() + Send>;

/// Tracks the single active notification of a session.
#[derive(Default)]
pub struct NotificationManager {
  active: Mutex<Option<DismissHandle>>,
}

impl std::fmt::Debug for NotificationManager {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("NotificationManager").field("active", &self.is_active()).finish()
  }
}

impl NotificationManager {
  /// A manager with nothing showing.
  pub fn new() -> Self { Self::default() }

  /// Dismisses the current notification, if any, and makes `dismiss` the active one.
  pub fn show(&self, dismiss: impl FnOnce() + Send + 'static) {
    self.dismiss();
    *self.lock() = Some(Box::new(dismiss));
  }

  /// Forgets the active notification without dismissing it, for when it already closed itself.
  pub fn clear(&self) { self.lock().take(); }

  /// Dismisses the active notification.
  pub fn dismiss(&self) {
    let active = self.lock().take();
    if let Some(active) = active {
      active();
    }
  }

  /// Whether a notification is currently shown.
  pub fn is_active(&self) -> bool { self.lock().is_some() }

  fn lock(&self) -> std::sync::MutexGuard<'_, Option<DismissHandle>> {
    self.active.lock().unwrap_or_else(|e| e.into_inner())
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = {
      let count = Arc::clone(&count);
      move || {
        count.fetch_add(1, Ordering::SeqCst);
      }
    };
    (count, handle)
  }

  #[test]
  fn test_show_replaces_previous() {
    let manager = NotificationManager::new();
    let (first, first_handle) = counter();
    let (second, second_handle) = counter();

    manager.show(first_handle);
    assert!(manager.is_active());
    manager.show(second_handle);
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);

    manager.dismiss();
    assert_eq!(second.load(Ordering::SeqCst), 1);
    assert!(!manager.is_active());
  }

  #[test]
  fn test_clear_does_not_dismiss() {
    let manager = NotificationManager::new();
    let (count, handle) = counter();
    manager.show(handle);
    manager.clear();
    manager.dismiss();
    assert_eq!(count.load(Ordering::SeqCst), 0);
  }

  #[test]
  fn test_dismiss_from_inside_handle_does_not_deadlock() {
    let manager = Arc::new(NotificationManager::new());
    let inner = Arc::clone(&manager);
    manager.show(move || inner.clear());
    manager.show(|| {});
    assert!(manager.is_active());
  }
}
