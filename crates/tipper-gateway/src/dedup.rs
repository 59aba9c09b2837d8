use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, PoisonError};

/// Bounded memory of recently seen platform event ids.
///
/// Redeliveries inside the window are dropped. Older redeliveries are not
/// caught and may trigger a second transfer.
pub struct RecentEvents {
    capacity: usize,
    seen: Mutex<Window>,
}

#[derive(Default)]
struct Window {
    ids: HashSet<String>,
    order: VecDeque<String>,
}

impl RecentEvents {
    /// A capacity of zero disables the guard.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            seen: Mutex::new(Window::default()),
        }
    }

    /// Record `id`. Returns `false` if it was already in the window.
    pub fn first_seen(&self, id: &str) -> bool {
        if self.capacity == 0 {
            return true;
        }

        let mut window = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        if window.ids.contains(id) {
            return false;
        }

        if window.order.len() >= self.capacity {
            if let Some(oldest) = window.order.pop_front() {
                window.ids.remove(&oldest);
            }
        }

        window.ids.insert(id.to_string());
        window.order.push_back(id.to_string());
        true
    }
}
