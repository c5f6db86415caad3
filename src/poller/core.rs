//! Registration and dispatch layer over the native reactors.

use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::time::Duration;

use log::trace;

use super::common::{pack_token, unpack_token, Backend, RawEvent, Ready, Trigger};
use super::registry::{Active, Entry, Registry};
use super::DefaultBackend;

/// Readiness callback for a registered descriptor.
///
/// Invoked from [`Poller::wait`] with the poller itself, the descriptor,
/// the readiness bits being delivered, and the registration's user data.
/// The poller borrow allows the callback to register, mute, or remove
/// descriptors, including its own.
pub type Callback<T, B> = Box<dyn FnMut(&mut Poller<T, B>, RawFd, Ready, &mut T)>;

/// Readiness-notification multiplexer.
///
/// Descriptors are registered with a callback, a per-registration value
/// of type `T`, and a [`Trigger`] mode, then subscribed to readiness
/// with [`listen`](Poller::listen). Each [`wait`](Poller::wait) cycle
/// collects native events and invokes the callbacks of the registered
/// descriptors that became ready.
///
/// The backend defaults to the platform's native reactor; tests and
/// special deployments can force a specific one through
/// [`with_backend`](Poller::with_backend).
pub struct Poller<T, B: Backend = DefaultBackend> {
    registry: Registry<T, B>,
    backend: B,
    events: Vec<RawEvent>,
    next_generation: u32,
}

impl<T> Poller<T, DefaultBackend> {
    /// Create a poller over the platform's default reactor.
    pub fn new() -> io::Result<Self> {
        Ok(Poller::with_backend(DefaultBackend::new()?))
    }
}

impl<T, B: Backend> Poller<T, B> {
    /// Create a poller over an explicitly constructed reactor.
    pub fn with_backend(backend: B) -> Self {
        Poller {
            registry: Registry::new(),
            backend,
            events: Vec::new(),
            next_generation: 0,
        }
    }

    /// Register `fd` with no initial interest.
    ///
    /// Re-adding a registered descriptor replaces its callback, data,
    /// and trigger mode in place; the interest set and the native
    /// registration are left untouched.
    pub fn add<F>(&mut self, fd: RawFd, trigger: Trigger, data: T, callback: F) -> io::Result<()>
    where
        F: FnMut(&mut Poller<T, B>, RawFd, Ready, &mut T) + 'static,
    {
        let active = Active {
            callback: Box::new(callback),
            data,
        };
        match self.registry.find(fd) {
            Ok(index) => {
                trace!("re-adding fd {} in place", fd);
                let entry = self.registry.get_mut(index);
                entry.trigger = trigger;
                entry.active = Some(active);
            }
            Err(index) => {
                let generation = self.next_generation;
                self.backend
                    .add(fd, pack_token(fd, generation), Ready::empty(), trigger)?;
                self.next_generation = self.next_generation.wrapping_add(1);
                self.registry.insert(
                    index,
                    Entry {
                        fd,
                        generation,
                        interest: Ready::empty(),
                        trigger,
                        seen: Ready::empty(),
                        active: Some(active),
                    },
                );
            }
        }
        Ok(())
    }

    /// Drop the registration for `fd`. Safe to call from inside the
    /// descriptor's own callback; events already collected for the old
    /// registration are discarded by their stale generation.
    pub fn remove(&mut self, fd: RawFd) {
        if let Ok(index) = self.registry.find(fd) {
            trace!("removing fd {}", fd);
            self.backend.remove(fd);
            self.registry.remove(index);
        }
    }

    /// Add `ready` to the interest set of `fd`.
    ///
    /// Bits outside `READ | WRITE` are ignored. Newly listened bits are
    /// cleared from the already-reported state so an edge-triggered
    /// registration that is currently ready fires on the next wait.
    pub fn listen(&mut self, fd: RawFd, ready: Ready) {
        if let Ok(index) = self.registry.find(fd) {
            let entry = self.registry.get_mut(index);
            entry.interest |= ready & (Ready::READ | Ready::WRITE);
            entry.seen &= !ready;
            let (token, interest, trigger) =
                (pack_token(fd, entry.generation), entry.interest, entry.trigger);
            self.backend.modify(fd, token, interest, trigger);
        }
    }

    /// Remove `ready` from the interest set of `fd`. The registration
    /// stays in place and can be re-listened later.
    pub fn mute(&mut self, fd: RawFd, ready: Ready) {
        if let Ok(index) = self.registry.find(fd) {
            let entry = self.registry.get_mut(index);
            entry.interest &= !ready;
            let (token, interest, trigger) =
                (pack_token(fd, entry.generation), entry.interest, entry.trigger);
            self.backend.modify(fd, token, interest, trigger);
        }
    }

    /// Forget the readiness already reported for `fd`, re-arming an
    /// edge-triggered registration without draining the descriptor.
    pub fn reset_events(&mut self, fd: RawFd) {
        if let Ok(index) = self.registry.find(fd) {
            let entry = self.registry.get_mut(index);
            entry.seen = Ready::empty();
            let (token, interest, trigger) =
                (pack_token(fd, entry.generation), entry.interest, entry.trigger);
            self.backend.modify(fd, token, interest, trigger);
        }
    }

    /// Borrow the user data registered with `fd`.
    ///
    /// Returns `None` when `fd` is not registered, or while its callback
    /// is executing (the data is lent to the callback for that span).
    pub fn data(&self, fd: RawFd) -> Option<&T> {
        let index = self.registry.find(fd).ok()?;
        self.registry
            .get(index)
            .active
            .as_ref()
            .map(|active| &active.data)
    }

    /// Mutably borrow the user data registered with `fd`.
    pub fn data_mut(&mut self, fd: RawFd) -> Option<&mut T> {
        let index = self.registry.find(fd).ok()?;
        self.registry
            .get_mut(index)
            .active
            .as_mut()
            .map(|active| &mut active.data)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Registered descriptors in ascending order.
    pub fn descriptors(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.registry.descriptors()
    }

    /// Wait up to `timeout` for readiness and dispatch callbacks.
    ///
    /// `None` blocks until at least one event arrives. Returns the
    /// number of native events reported, which can exceed the number of
    /// callbacks invoked when events are filtered out by edge state or
    /// stale generations.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        let timeout_ms = match timeout {
            Some(timeout) => timeout.as_millis().min(i32::MAX as u128) as i32,
            None => -1,
        };

        // Swapping the buffer out keeps a recursive wait from a callback
        // working over its own, empty event list.
        let mut events = mem::take(&mut self.events);
        events.clear();
        let nready = match self.backend.wait(&mut events, timeout_ms) {
            Ok(nready) => nready,
            Err(err) => {
                self.events = events;
                return Err(err);
            }
        };
        trace!("backend reported {} events", nready);

        for event in &events {
            let (fd, generation) = unpack_token(event.token);
            let index = match self.registry.find(fd) {
                Ok(index) => index,
                Err(_) => continue,
            };
            let entry = self.registry.get_mut(index);
            if entry.generation != generation {
                trace!("discarding stale event for fd {}", fd);
                continue;
            }

            let mut ready = event.ready;
            if B::FILTERS_EDGE {
                ready &= entry.interest | Ready::ERROR;
                if let Trigger::Edge = entry.trigger {
                    ready &= !entry.seen;
                }
                // ERROR is excluded from the seen set so error
                // conditions keep being delivered each cycle.
                entry.seen |= ready & (Ready::READ | Ready::WRITE);
            }
            if ready.is_empty() {
                continue;
            }

            let mut active = match entry.active.take() {
                Some(active) => active,
                // Callback already running further up the stack.
                None => continue,
            };
            (active.callback)(self, fd, ready, &mut active.data);

            // Put the callback back only if the registration survived
            // the invocation unchanged.
            if let Ok(index) = self.registry.find(fd) {
                let entry = self.registry.get_mut(index);
                if entry.generation == generation && entry.active.is_none() {
                    entry.active = Some(active);
                }
            }
        }

        events.clear();
        self.events = events;
        Ok(nready)
    }
}

impl<T, B: Backend> Drop for Poller<T, B> {
    fn drop(&mut self) {
        // Dropping with live registrations is a bookkeeping bug in the
        // caller's teardown path. Skipped mid-panic so a failing caller
        // does not abort on the double panic.
        if !std::thread::panicking() {
            debug_assert!(
                self.registry.is_empty(),
                "poller dropped with descriptors still registered"
            );
        }
    }
}
