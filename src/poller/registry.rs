//! Sorted descriptor registry.
//!
//! Registrations are kept in a `Vec` ordered by raw descriptor value and
//! located with binary search, so lookup is `O(log n)` while iteration
//! during dispatch stays cache-friendly. The registry owns everything the
//! dispatcher needs per descriptor: the interest set, the trigger mode,
//! the readiness bits already reported (for synthesized edge semantics),
//! and the callback/data pair.

use std::os::unix::io::RawFd;

use super::common::{Backend, Ready, Trigger};
use super::core::Callback;

/// The invocable half of a registration. Taken out of the entry while
/// the callback runs so the dispatcher can hand the callback a mutable
/// borrow of the whole poller.
pub(crate) struct Active<T, B: Backend> {
    pub(crate) callback: Callback<T, B>,
    pub(crate) data: T,
}

/// One registered descriptor.
pub(crate) struct Entry<T, B: Backend> {
    pub(crate) fd: RawFd,
    /// Registration generation, embedded in the native token. Events
    /// carrying a stale generation are discarded on delivery, which
    /// makes remove-then-re-add safe while events are in flight.
    pub(crate) generation: u32,
    pub(crate) interest: Ready,
    pub(crate) trigger: Trigger,
    /// Readiness already reported to the callback. Only meaningful for
    /// backends that report level-triggered natively; never contains
    /// `ERROR`, so error conditions are redelivered every cycle.
    pub(crate) seen: Ready,
    /// `None` while the callback is being invoked, or after the entry
    /// was removed out from under an in-flight invocation.
    pub(crate) active: Option<Active<T, B>>,
}

/// Registrations sorted by descriptor.
pub(crate) struct Registry<T, B: Backend> {
    entries: Vec<Entry<T, B>>,
}

impl<T, B: Backend> Registry<T, B> {
    pub(crate) fn new() -> Self {
        Registry {
            entries: Vec::new(),
        }
    }

    /// Locate `fd`. `Ok(index)` when registered, `Err(index)` with the
    /// insertion position that keeps the vector sorted when not.
    pub(crate) fn find(&self, fd: RawFd) -> Result<usize, usize> {
        self.entries.binary_search_by_key(&fd, |entry| entry.fd)
    }

    pub(crate) fn get(&self, index: usize) -> &Entry<T, B> {
        &self.entries[index]
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> &mut Entry<T, B> {
        &mut self.entries[index]
    }

    /// Insert `entry` at `index`, which must be the position reported by
    /// [`find`](Self::find) for the entry's descriptor.
    pub(crate) fn insert(&mut self, index: usize, entry: Entry<T, B>) {
        debug_assert!(index == 0 || self.entries[index - 1].fd < entry.fd);
        debug_assert!(index == self.entries.len() || entry.fd < self.entries[index].fd);
        self.entries.insert(index, entry);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Entry<T, B> {
        self.entries.remove(index)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered descriptors in ascending order.
    pub(crate) fn descriptors(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.entries.iter().map(|entry| entry.fd)
    }
}
