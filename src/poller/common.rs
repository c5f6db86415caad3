//! Shared backend vocabulary: readiness bits, trigger modes, and the
//! interface every native reactor implements.

use std::io;
use std::os::unix::io::RawFd;

use bitflags::bitflags;

bitflags! {
    /// Readiness bits exchanged with callbacks and backends.
    ///
    /// `READ` and `WRITE` form the subscribable interest set. `ERROR` is
    /// derived on delivery: any native condition outside read/write
    /// readiness (hangup, invalid descriptor, priority data) maps to it.
    /// It cannot be subscribed to directly and is reported whenever the
    /// descriptor is registered, regardless of the interest set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Ready: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const ERROR = 1 << 2;
    }
}

/// Notification style for a registered descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Fire once per transition into the ready state. The descriptor must
    /// be drained, or [`reset_events`](crate::Poller::reset_events)
    /// called, before it fires again.
    Edge,
    /// Fire on every wait cycle while the condition holds.
    Level,
}

/// A translated native event: the registration token it was delivered
/// for, plus the abstract readiness bits.
#[derive(Debug, Clone, Copy)]
pub struct RawEvent {
    /// Token stored with the native registration.
    pub token: u64,
    /// Translated readiness bits.
    pub ready: Ready,
}

/// Pack a descriptor and its registration generation into the token
/// handed to the native reactor.
pub(crate) fn pack_token(fd: RawFd, generation: u32) -> u64 {
    (u64::from(generation) << 32) | u64::from(fd as u32)
}

/// Recover the descriptor and generation from a native token.
pub(crate) fn unpack_token(token: u64) -> (RawFd, u32) {
    (token as u32 as RawFd, (token >> 32) as u32)
}

/// The interface implemented by each native reactor.
///
/// Exactly one implementation is selected as
/// [`DefaultBackend`](crate::DefaultBackend) by the build configuration;
/// the others remain available for explicit construction through
/// [`Poller::with_backend`](crate::Poller::with_backend).
pub trait Backend: Sized {
    /// True when the backend reports readiness level-triggered natively,
    /// requiring the dispatcher to synthesize edge semantics from
    /// leftover readiness state.
    const FILTERS_EDGE: bool;

    /// Create the native reactor resource.
    fn new() -> io::Result<Self>;

    /// Register `fd` with the native reactor under `token`.
    fn add(&mut self, fd: RawFd, token: u64, interest: Ready, trigger: Trigger) -> io::Result<()>;

    /// Push an updated interest set for an existing registration. For
    /// edge-capable reactors this also re-arms the trigger.
    fn modify(&mut self, fd: RawFd, token: u64, interest: Ready, trigger: Trigger);

    /// Drop the native registration for `fd`.
    fn remove(&mut self, fd: RawFd);

    /// Wait for readiness, appending translated events to `events`.
    ///
    /// Returns the number of native events reported. An interrupted wait
    /// is absorbed and reported as zero events.
    fn wait(&mut self, events: &mut Vec<RawEvent>, timeout_ms: i32) -> io::Result<usize>;
}
