// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! One-shot pipe transport between the dispatcher and its worker.
//!
//! A fresh pair is created per invocation and torn down with the call. The
//! worker writes at most one frame; the parent reads at most one. Either side
//! may go away without blocking the other indefinitely — the reader sees EOF
//! once every write end is closed, the writer sees `EPIPE`.

use std::{
    io,
    os::fd::{AsFd, AsRawFd, OwnedFd},
    time::{Duration, Instant},
};

use nix::{
    errno::Errno,
    poll::{PollFd, PollFlags, PollTimeout, poll},
    unistd,
};
use thiserror::Error;

use crate::models::execution::ExecutionResult;

/// Frames carry a little-endian u32 length followed by a bincode payload.
const FRAME_HEADER_LEN: usize = 4;
/// A header above this is corruption, not a real frame.
const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("failed to encode result: {0}")]
    Encode(#[from] Box<bincode::ErrorKind>),
    #[error("channel write failed: {0}")]
    Io(Errno),
}

#[derive(Debug, Error)]
pub enum RecvError {
    #[error("no value arrived within {0:?}")]
    Timeout(Duration),
    #[error("channel closed before a value arrived")]
    Disconnected,
    #[error("channel read failed: {0}")]
    Io(Errno),
    #[error("failed to decode received frame: {0}")]
    Decode(#[from] Box<bincode::ErrorKind>),
}

/// Worker-side write end.
pub struct Sender {
    fd: OwnedFd,
}

/// Parent-side read end.
pub struct Receiver {
    fd: OwnedFd,
}

/// Fresh pipe pair for exactly one worker round-trip.
pub fn channel() -> io::Result<(Receiver, Sender)> {
    let (read_end, write_end) = unistd::pipe()?;
    Ok((Receiver { fd: read_end }, Sender { fd: write_end }))
}

impl Sender {
    /// Write the single outcome as one length-prefixed frame.
    pub fn send(&self, value: &ExecutionResult) -> Result<(), SendError> {
        let payload = bincode::serialize(value)?;
        let header = (payload.len() as u32).to_le_bytes();
        self.write_all(&header)?;
        self.write_all(&payload)
    }

    fn write_all(&self, mut buf: &[u8]) -> Result<(), SendError> {
        while !buf.is_empty() {
            match unistd::write(&self.fd, buf) {
                Ok(0) => return Err(SendError::Io(Errno::EPIPE)),
                Ok(n) => buf = &buf[n..],
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(SendError::Io(err)),
            }
        }
        Ok(())
    }
}

impl Receiver {
    /// Block until a frame arrives or `timeout` elapses.
    ///
    /// A transient signal (`EINTR`) during the wait is retried against the
    /// original deadline — it is not a failure.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ExecutionResult, RecvError> {
        let deadline = Instant::now() + timeout;
        self.wait_readable(deadline, timeout)?;

        let mut header = [0u8; FRAME_HEADER_LEN];
        self.read_exact(&mut header)?;
        let frame_len = u32::from_le_bytes(header);
        if frame_len > MAX_FRAME_LEN {
            return Err(RecvError::Io(Errno::EBADMSG));
        }

        let mut payload = vec![0u8; frame_len as usize];
        self.read_exact(&mut payload)?;
        Ok(bincode::deserialize(&payload)?)
    }

    fn wait_readable(&self, deadline: Instant, timeout: Duration) -> Result<(), RecvError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let millis = remaining.as_millis().min(i32::MAX as u128) as i32;
            let poll_timeout = PollTimeout::try_from(millis).unwrap_or(PollTimeout::MAX);

            let mut fds = [PollFd::new(self.fd.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, poll_timeout) {
                // POLLIN and POLLHUP both fall through to the read, which
                // tells a frame from an EOF.
                Ok(n) if n > 0 => return Ok(()),
                Ok(_) => return Err(RecvError::Timeout(timeout)),
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(RecvError::Io(err)),
            }
        }
    }

    fn read_exact(&self, buf: &mut [u8]) -> Result<(), RecvError> {
        let mut filled = 0;
        while filled < buf.len() {
            match unistd::read(self.fd.as_raw_fd(), &mut buf[filled..]) {
                Ok(0) => return Err(RecvError::Disconnected),
                Ok(n) => filled += n,
                Err(Errno::EINTR) => continue,
                Err(err) => return Err(RecvError::Io(err)),
            }
        }
        Ok(())
    }
}
