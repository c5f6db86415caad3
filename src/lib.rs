//! # fdpoll
//!
//! **fdpoll** is a lightweight readiness-notification layer for Unix
//! descriptors, built as the multiplexing core for callback-driven event
//! loops.
//!
//! Unlike full reactor frameworks, fdpoll stops at the readiness
//! boundary: you register a descriptor with a callback and a trigger
//! mode, subscribe it to read/write interest, and drive everything from
//! a single [`Poller::wait`] loop. What happens on readiness is entirely
//! the caller's business.
//!
//! The crate offers:
//!
//! - An **epoll(7) reactor** on Linux and Android, with kernel-side
//!   edge triggering via `EPOLLET`
//! - A **portable poll(2) reactor** everywhere else, with edge semantics
//!   synthesized in the dispatch layer
//! - A **select(2) emulation of poll(2)** for platforms where poll is
//!   broken or missing
//! - **Edge and level trigger modes** selectable per registration
//! - **Reentrant callbacks** that may register, mute, or remove
//!   descriptors, including their own
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fdpoll::{Poller, Ready, Trigger};
//! use std::time::Duration;
//!
//! let mut poller: Poller<&str> = Poller::new()?;
//!
//! poller.add(sock_fd, Trigger::Edge, "client", |poller, fd, ready, name| {
//!     if ready.contains(Ready::ERROR) {
//!         poller.remove(fd);
//!         return;
//!     }
//!     println!("{name} is ready: {ready:?}");
//! })?;
//! poller.listen(sock_fd, Ready::READ | Ready::WRITE);
//!
//! loop {
//!     poller.wait(Some(Duration::from_millis(100)))?;
//! }
//! ```
//!
//! ## Backends
//!
//! The platform default is chosen at compile time as [`DefaultBackend`].
//! The `poll-backend` feature forces the portable reactor on every
//! platform, and `select-backend` additionally routes its wait through
//! [`select::poll_with_select`]. Any backend can also be constructed
//! explicitly and handed to [`Poller::with_backend`].

mod poller;

pub use poller::select;
pub use poller::{Backend, Callback, DefaultBackend, PollBackend, Poller, RawEvent, Ready, Trigger};

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use poller::EpollBackend;
