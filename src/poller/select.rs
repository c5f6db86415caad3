//! poll(2) emulated over select(2).
//!
//! Kept for platforms whose poll(2) is broken or absent. The emulation
//! covers the subset of the interface the poll backend uses: `POLLIN`
//! and `POLLOUT` interest, exceptional conditions folded into `POLLERR`,
//! and millisecond timeouts with `-1` meaning block forever.

use std::io;
use std::mem;
use std::ptr;

/// Drop-in replacement for `libc::poll` built on select(2).
///
/// Descriptors with negative `fd` values are skipped, as poll(2) does.
/// Every registered descriptor is watched for exceptional conditions
/// regardless of its interest set; those are reported as `POLLERR`.
///
/// Returns the number of entries with nonzero `revents`.
pub fn poll_with_select(fds: &mut [libc::pollfd], timeout_ms: i32) -> io::Result<usize> {
    // SAFETY: fd_set is plain bitmap storage; all-zeroes is the empty set.
    let mut read_set: libc::fd_set = unsafe { mem::zeroed() };
    let mut write_set: libc::fd_set = unsafe { mem::zeroed() };
    let mut except_set: libc::fd_set = unsafe { mem::zeroed() };
    unsafe {
        libc::FD_ZERO(&mut read_set);
        libc::FD_ZERO(&mut write_set);
        libc::FD_ZERO(&mut except_set);
    }

    let mut max_fd = -1;
    for pollfd in fds.iter() {
        if pollfd.fd < 0 {
            continue;
        }
        // SAFETY: fd is non-negative and FD_SET only writes within the
        // fd_set bitmap.
        unsafe {
            if pollfd.events & libc::POLLIN != 0 {
                libc::FD_SET(pollfd.fd, &mut read_set);
            }
            if pollfd.events & libc::POLLOUT != 0 {
                libc::FD_SET(pollfd.fd, &mut write_set);
            }
            libc::FD_SET(pollfd.fd, &mut except_set);
        }
        if pollfd.fd > max_fd {
            max_fd = pollfd.fd;
        }
    }

    let mut timeout = libc::timeval {
        tv_sec: (timeout_ms / 1000) as libc::time_t,
        tv_usec: ((timeout_ms % 1000) * 1000) as libc::suseconds_t,
    };
    let timeout_ptr = if timeout_ms < 0 {
        ptr::null_mut()
    } else {
        &mut timeout as *mut libc::timeval
    };

    // SAFETY: the sets and timeout are valid for the duration of the call.
    let rc = unsafe {
        libc::select(
            max_fd + 1,
            &mut read_set,
            &mut write_set,
            &mut except_set,
            timeout_ptr,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    let mut nready = 0;
    for pollfd in fds.iter_mut() {
        pollfd.revents = 0;
        if pollfd.fd < 0 {
            continue;
        }
        // SAFETY: read-only membership tests on the sets filled above.
        unsafe {
            // An exceptional condition outranks read readiness; write
            // readiness is reported independently of both.
            if libc::FD_ISSET(pollfd.fd, &except_set) {
                pollfd.revents |= libc::POLLERR;
            } else if libc::FD_ISSET(pollfd.fd, &read_set) {
                pollfd.revents |= libc::POLLIN;
            }
            if libc::FD_ISSET(pollfd.fd, &write_set) {
                pollfd.revents |= libc::POLLOUT;
            }
        }
        if pollfd.revents != 0 {
            nready += 1;
        }
    }
    Ok(nready)
}
