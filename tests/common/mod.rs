//! Pipe fixtures shared by the integration tests.

#![allow(dead_code)]

use std::io;
use std::os::unix::io::RawFd;

/// A nonblocking anonymous pipe. Both ends are closed on drop.
pub struct Pipe {
    pub read: RawFd,
    pub write: RawFd,
}

impl Pipe {
    pub fn new() -> Pipe {
        let mut fds = [0 as RawFd; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(
            rc,
            0,
            "Failed to create pipe: {}",
            io::Error::last_os_error()
        );
        for &fd in &fds {
            set_nonblocking(fd);
        }
        Pipe {
            read: fds[0],
            write: fds[1],
        }
    }

    /// Make the read end readable.
    pub fn put(&self) {
        let byte = [0u8];
        let rc = unsafe { libc::write(self.write, byte.as_ptr().cast(), 1) };
        assert_eq!(rc, 1, "Failed to write to pipe");
    }

    /// Read the pipe dry.
    pub fn drain(&self) {
        let mut buf = [0u8; 64];
        loop {
            let rc = unsafe { libc::read(self.read, buf.as_mut_ptr().cast(), buf.len()) };
            if rc <= 0 {
                break;
            }
        }
    }

    /// Close the read end, leaving the write end in an error state.
    pub fn close_read(&mut self) {
        unsafe { libc::close(self.read) };
        self.read = -1;
    }
}

fn set_nonblocking(fd: RawFd) {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    assert!(flags >= 0, "Failed to query descriptor flags");
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    assert_eq!(rc, 0, "Failed to set descriptor nonblocking");
}

impl Drop for Pipe {
    fn drop(&mut self) {
        unsafe {
            if self.read >= 0 {
                libc::close(self.read);
            }
            libc::close(self.write);
        }
    }
}
