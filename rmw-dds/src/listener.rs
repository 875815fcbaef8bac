//! Reader listener attached to a subscription.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::transport::ReaderListener;

/// Invoked with the number of samples that arrived since the last notification.
pub type NewMessageCallback = Arc<dyn Fn(usize) + Send + Sync>;

#[derive(Default)]
struct State {
    unread: usize,
    // arrivals nobody has been told about because no callback was installed
    unnotified: usize,
    matched_publishers: i32,
    on_new_message: Option<NewMessageCallback>,
}

/// Counts samples the transport signals and wakes waiters.
#[derive(Default)]
pub struct SubscriptionListener {
    state: Mutex<State>,
    cv: Condvar,
}

impl SubscriptionListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unread_count(&self) -> usize {
        self.state.lock().unread
    }

    pub fn has_data(&self) -> bool {
        self.unread_count() > 0
    }

    /// Marks one sample as consumed. Returns `false` when nothing was unread.
    pub fn take_one(&self) -> bool {
        let mut state = self.state.lock();
        if state.unread == 0 {
            return false;
        }
        state.unread -= 1;
        true
    }

    pub fn matched_publishers(&self) -> i32 {
        self.state.lock().matched_publishers
    }

    /// Installs (or clears) the new-message callback.
    ///
    /// Samples that arrived while no callback was installed are reported to the new
    /// callback right away, in a single call.
    pub fn set_on_new_message_callback(&self, callback: Option<NewMessageCallback>) {
        let replay = {
            let mut state = self.state.lock();
            state.on_new_message = callback.clone();
            match callback {
                Some(cb) if state.unnotified > 0 => {
                    let count = std::mem::take(&mut state.unnotified);
                    Some((cb, count))
                }
                _ => None,
            }
        };
        if let Some((cb, count)) = replay {
            cb(count);
        }
    }

    /// Blocks until a sample is unread or `timeout` elapses; `None` waits forever.
    ///
    /// A timeout too large to express as a deadline also waits forever.
    pub fn wait_for_data(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.state.lock();
        while state.unread == 0 {
            match deadline {
                Some(deadline) => {
                    if self.cv.wait_until(&mut state, deadline).timed_out() {
                        return state.unread > 0;
                    }
                }
                None => self.cv.wait(&mut state),
            }
        }
        true
    }
}

impl ReaderListener for SubscriptionListener {
    fn on_data_available(&self) {
        let callback = {
            let mut state = self.state.lock();
            state.unread += 1;
            if state.on_new_message.is_none() {
                state.unnotified += 1;
            }
            self.cv.notify_all();
            state.on_new_message.clone()
        };
        if let Some(cb) = callback {
            cb(1);
        }
    }

    fn on_subscription_matched(&self, current_count_change: i32) {
        let mut state = self.state.lock();
        state.matched_publishers = (state.matched_publishers + current_count_change).max(0);
        tracing::debug!("matched publishers: {}", state.matched_publishers);
    }
}
