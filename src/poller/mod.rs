//! Readiness notification over the platform's native reactor.
//!
//! The module splits into a portable dispatch layer ([`core`]) and one
//! reactor implementation per platform interface. Exactly one reactor
//! becomes [`DefaultBackend`]:
//!
//! - Linux and Android use [`EpollBackend`], with kernel-side edge
//!   triggering through `EPOLLET`.
//! - Everything else, and any build with the `poll-backend` feature,
//!   uses [`PollBackend`], with edge semantics synthesized in the
//!   dispatch layer. The `select-backend` feature reroutes its wait
//!   through the select(2) emulation in [`select`].

mod common;
mod core;
mod poll;
mod registry;
pub mod select;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod epoll;

pub use self::common::{Backend, RawEvent, Ready, Trigger};
pub use self::core::{Callback, Poller};
pub use self::poll::PollBackend;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use self::epoll::EpollBackend;

/// The reactor selected by the build configuration.
#[cfg(all(
    any(target_os = "linux", target_os = "android"),
    not(feature = "poll-backend")
))]
pub type DefaultBackend = EpollBackend;

/// The reactor selected by the build configuration.
#[cfg(any(
    not(any(target_os = "linux", target_os = "android")),
    feature = "poll-backend"
))]
pub type DefaultBackend = PollBackend;
