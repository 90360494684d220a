// SPDX-License-Identifier: MIT

//! Host side of the link: one request at a time, with retries.

use std::time::Duration;

use crate::command::*;
use crate::errors::*;
use crate::frame::*;
use crate::params::*;
use crate::transport::Transport;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries per request, the first one included.
    pub attempts: u32,
    /// Wait before the first retry; doubled on each further retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match 1u32.checked_shl(retry) {
            Some(factor) => self.backoff.checked_mul(factor).unwrap_or(Duration::MAX),
            None => Duration::MAX,
        }
    }
}

pub struct HostLink<T: Transport> {
    link: T,
    policy: RetryPolicy,
}

impl<T: Transport> HostLink<T> {
    pub fn new(link: T, policy: RetryPolicy) -> Self {
        Self { link, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn into_inner(self) -> T {
        self.link
    }

    /// Sends `request` and waits for its checked, successful response.
    pub fn transact(&mut self, request: &Frame) -> ProtoResult<Frame> {
        let attempts = self.policy.attempts.max(1);
        let mut last = ProtoError::Mismatch("No attempt made");
        for attempt in 0..attempts {
            if attempt > 0 {
                let wait = self.policy.delay(attempt - 1);
                debug!("retry {attempt}/{} in {wait:?}", attempts - 1);
                std::thread::sleep(wait);
                self.link.discard_input()?;
            }
            match self.exchange(request) {
                Ok(resp) => return Ok(resp),
                Err(e) if e.is_transient() => {
                    warn!(
                        "command {:#04x}: attempt {}/{attempts} failed: {e}",
                        request.command,
                        attempt + 1
                    );
                    last = e;
                }
                Err(e) => return Err(e),
            }
        }
        Err(last)
    }

    fn exchange(&mut self, request: &Frame) -> ProtoResult<Frame> {
        write_frame(&mut self.link, request)?;
        let resp = read_frame(&mut self.link)?;
        resp.validate_command()?;
        if resp.protocol != request.protocol || resp.command != request.command {
            return Err(ProtoError::Mismatch("Response does not answer the request"));
        }
        resp.validate_data()?;
        let status = resp.status()?;
        if !status.is_ok() {
            return Err(ProtoError::Device(status));
        }
        Ok(resp)
    }

    fn simple(&mut self, command: Command) -> ProtoResult<Frame> {
        let req = Frame::request(command, Vec::new(), Vec::new())?;
        self.transact(&req)
    }

    /// Asks the device to rescan its images and returns the unit catalog.
    pub fn init(&mut self) -> ProtoResult<InitPayload> {
        let resp = self.simple(Command::Init)?;
        InitPayload::decode(&resp.data)
    }

    pub fn media_check(&mut self) -> ProtoResult<()> {
        self.simple(Command::MediaCheck).map(|_| ())
    }

    pub fn build_bpb(&mut self) -> ProtoResult<()> {
        self.simple(Command::BuildBpb).map(|_| ())
    }

    pub fn drive_info(&mut self) -> ProtoResult<()> {
        self.simple(Command::DriveInfo).map(|_| ())
    }

    pub fn read(&mut self, params: IoParams) -> ProtoResult<Vec<u8>> {
        let req = Frame::request(Command::Read, params.to_bytes().to_vec(), Vec::new())?;
        Ok(self.transact(&req)?.data)
    }

    pub fn write(&mut self, params: IoParams, data: Vec<u8>) -> ProtoResult<()> {
        let req = Frame::request(Command::Write, params.to_bytes().to_vec(), data)?;
        self.transact(&req).map(|_| ())
    }
}
