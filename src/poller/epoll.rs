//! epoll(7) reactor, the default on Linux and Android.
//!
//! Edge triggering is delegated to the kernel with `EPOLLET`, so the
//! dispatcher never has to synthesize edges for this backend. Interest
//! updates go through `EPOLL_CTL_MOD`, which also re-arms an
//! edge-triggered registration.

use std::io;
use std::os::unix::io::RawFd;
use std::ptr;

use log::{debug, warn};

use super::common::{Backend, RawEvent, Ready, Trigger};

/// Upper bound on events translated per wait cycle.
const MAX_EVENTS: usize = 256;

pub struct EpollBackend {
    epoll: RawFd,
    events: Vec<libc::epoll_event>,
}

fn interest_flags(interest: Ready, trigger: Trigger) -> u32 {
    let mut flags = 0;
    if interest.contains(Ready::READ) {
        flags |= libc::EPOLLIN;
    }
    if interest.contains(Ready::WRITE) {
        flags |= libc::EPOLLOUT;
    }
    if let Trigger::Edge = trigger {
        flags |= libc::EPOLLET;
    }
    flags as u32
}

impl Backend for EpollBackend {
    const FILTERS_EDGE: bool = false;

    fn new() -> io::Result<Self> {
        // SAFETY: epoll_create1 allocates a new descriptor; no pointers
        // are involved.
        let epoll = unsafe { libc::epoll_create1(libc::EPOLL_CLOEXEC) };
        if epoll < 0 {
            return Err(io::Error::last_os_error());
        }
        debug!("created epoll instance fd={}", epoll);
        Ok(EpollBackend {
            epoll,
            events: Vec::with_capacity(MAX_EVENTS),
        })
    }

    fn add(&mut self, fd: RawFd, token: u64, interest: Ready, trigger: Trigger) -> io::Result<()> {
        let mut event = libc::epoll_event {
            events: interest_flags(interest, trigger),
            u64: token,
        };
        // SAFETY: `event` outlives the call; the kernel copies it.
        let rc = unsafe { libc::epoll_ctl(self.epoll, libc::EPOLL_CTL_ADD, fd, &mut event) };
        if rc == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn modify(&mut self, fd: RawFd, token: u64, interest: Ready, trigger: Trigger) {
        let mut event = libc::epoll_event {
            events: interest_flags(interest, trigger),
            u64: token,
        };
        // SAFETY: as in `add`.
        let rc = unsafe { libc::epoll_ctl(self.epoll, libc::EPOLL_CTL_MOD, fd, &mut event) };
        if rc == -1 {
            warn!(
                "epoll_ctl(MOD) failed for fd {}: {}",
                fd,
                io::Error::last_os_error()
            );
        }
    }

    fn remove(&mut self, fd: RawFd) {
        // SAFETY: since Linux 2.6.9 the event pointer may be null for DEL.
        let rc = unsafe { libc::epoll_ctl(self.epoll, libc::EPOLL_CTL_DEL, fd, ptr::null_mut()) };
        if rc == -1 {
            warn!(
                "epoll_ctl(DEL) failed for fd {}: {}",
                fd,
                io::Error::last_os_error()
            );
        }
    }

    fn wait(&mut self, events: &mut Vec<RawEvent>, timeout_ms: i32) -> io::Result<usize> {
        // SAFETY: the buffer has MAX_EVENTS capacity and the kernel
        // writes at most that many entries before we set the length.
        let n = unsafe {
            libc::epoll_wait(
                self.epoll,
                self.events.as_mut_ptr(),
                self.events.capacity() as i32,
                timeout_ms,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(err);
        }
        unsafe { self.events.set_len(n as usize) };

        for event in &self.events {
            let bits = event.events;
            let mut ready = Ready::empty();
            if bits & libc::EPOLLIN as u32 != 0 {
                ready |= Ready::READ;
            }
            if bits & libc::EPOLLOUT as u32 != 0 {
                ready |= Ready::WRITE;
            }
            if bits & !(libc::EPOLLIN | libc::EPOLLOUT) as u32 != 0 {
                ready |= Ready::ERROR;
            }
            events.push(RawEvent {
                token: event.u64,
                ready,
            });
        }
        Ok(n as usize)
    }
}

impl Drop for EpollBackend {
    fn drop(&mut self) {
        // SAFETY: closing a descriptor we own.
        if unsafe { libc::close(self.epoll) } == -1 {
            warn!(
                "failed to close epoll fd {}: {}",
                self.epoll,
                io::Error::last_os_error()
            );
        }
    }
}
