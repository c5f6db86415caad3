//! poll(2) reactor, the portable fallback.
//!
//! poll(2) is strictly level-triggered, so this backend sets
//! [`FILTERS_EDGE`](super::common::Backend::FILTERS_EDGE) and leaves
//! edge synthesis to the dispatcher. Registrations live in a pair of
//! parallel vectors sorted by descriptor: the `pollfd` array handed to
//! the kernel, and the token recovered per slot on delivery.
//!
//! With the `select-backend` feature the actual wait is routed through
//! [`poll_with_select`](super::select::poll_with_select) instead of
//! `libc::poll`, exercising the emulation on platforms that have both.

use std::io;
use std::os::unix::io::RawFd;

use super::common::{Backend, RawEvent, Ready, Trigger};

pub struct PollBackend {
    fds: Vec<libc::pollfd>,
    tokens: Vec<u64>,
}

fn interest_events(interest: Ready) -> libc::c_short {
    let mut events = 0;
    if interest.contains(Ready::READ) {
        events |= libc::POLLIN;
    }
    if interest.contains(Ready::WRITE) {
        events |= libc::POLLOUT;
    }
    events
}

#[cfg(not(feature = "select-backend"))]
fn sys_poll(fds: &mut [libc::pollfd], timeout_ms: i32) -> io::Result<usize> {
    // SAFETY: the slice pointer and length describe valid pollfd storage
    // for the duration of the call.
    let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(rc as usize)
}

#[cfg(feature = "select-backend")]
use super::select::poll_with_select as sys_poll;

impl PollBackend {
    fn position(&self, fd: RawFd) -> Result<usize, usize> {
        self.fds.binary_search_by_key(&fd, |pollfd| pollfd.fd)
    }
}

impl Backend for PollBackend {
    const FILTERS_EDGE: bool = true;

    fn new() -> io::Result<Self> {
        Ok(PollBackend {
            fds: Vec::new(),
            tokens: Vec::new(),
        })
    }

    fn add(&mut self, fd: RawFd, token: u64, interest: Ready, _trigger: Trigger) -> io::Result<()> {
        let index = match self.position(fd) {
            Ok(_) => return Err(io::Error::from_raw_os_error(libc::EEXIST)),
            Err(index) => index,
        };
        self.fds.insert(
            index,
            libc::pollfd {
                fd,
                events: interest_events(interest),
                revents: 0,
            },
        );
        self.tokens.insert(index, token);
        Ok(())
    }

    fn modify(&mut self, fd: RawFd, token: u64, interest: Ready, _trigger: Trigger) {
        if let Ok(index) = self.position(fd) {
            self.fds[index].events = interest_events(interest);
            self.tokens[index] = token;
        }
    }

    fn remove(&mut self, fd: RawFd) {
        if let Ok(index) = self.position(fd) {
            self.fds.remove(index);
            self.tokens.remove(index);
        }
    }

    fn wait(&mut self, events: &mut Vec<RawEvent>, timeout_ms: i32) -> io::Result<usize> {
        for pollfd in &mut self.fds {
            pollfd.revents = 0;
        }
        let n = match sys_poll(&mut self.fds, timeout_ms) {
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(err) => return Err(err),
        };
        for (pollfd, &token) in self.fds.iter().zip(&self.tokens) {
            let revents = pollfd.revents;
            if revents == 0 {
                continue;
            }
            let mut ready = Ready::empty();
            if revents & libc::POLLIN != 0 {
                ready |= Ready::READ;
            }
            if revents & libc::POLLOUT != 0 {
                ready |= Ready::WRITE;
            }
            if revents & !(libc::POLLIN | libc::POLLOUT) != 0 {
                ready |= Ready::ERROR;
            }
            events.push(RawEvent { token, ready });
        }
        Ok(n)
    }
}
