//! Error types

// Adapted from yubico-piv-tool:
// <https://github.com/Yubico/yubico-piv-tool/>
//
// Copyright (c) 2014-2016 Yubico AB
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//   * Redistributions of source code must retain the above copyright
//     notice, this list of conditions and the following disclaimer.
//
//   * Redistributions in binary form must reproduce the above
//     copyright notice, this list of conditions and the following
//     disclaimer in the documentation and/or other materials provided
//     with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use crate::status::StatusError;
use std::{fmt, io};

/// Result type with [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Kinds of errors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// Error communicating with the PC/SC resource manager
    PcscError {
        /// Original PC/SC error
        inner: Option<pcsc::Error>,
    },

    /// I/O error on an HID channel
    Channel {
        /// Kind of the underlying I/O error
        kind: io::ErrorKind,
    },

    /// HID channel has been closed
    ChannelClosed,

    /// Card response did not even contain a status word
    ResponseTooShort,

    /// Card returned a status word other than success
    Status(StatusError),

    /// HID report had an unexpected size
    InvalidReport {
        /// Size of the report received
        len: usize,
    },

    /// Device stopped sending response packets midway through a transfer
    IncompleteTransfer,

    /// Checksum over HID response data was not clean
    CrcMismatch,

    /// Device rejected the command without producing data
    CommandRejected,

    /// Operation did not complete in time
    Timeout(TimeoutKind),

    /// Malformed data
    ParseError,

    /// Size error
    SizeError,

    /// Not found
    NotFound,
}

/// Reasons an HID operation timed out.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimeoutKind {
    /// User did not touch the device before it gave up waiting
    Touch,

    /// Caller cancelled the operation
    Cancelled,

    /// Device never became ready to receive a report
    NotReady,
}

impl Error {
    /// Name of the error.
    pub fn name(self) -> &'static str {
        match self {
            Error::PcscError { .. } => "PCSC_ERROR",
            Error::Channel { .. } => "CHANNEL_ERROR",
            Error::ChannelClosed => "CHANNEL_CLOSED",
            Error::ResponseTooShort => "RESPONSE_TOO_SHORT",
            Error::Status(_) => "STATUS_ERROR",
            Error::InvalidReport { .. } => "INVALID_REPORT",
            Error::IncompleteTransfer => "INCOMPLETE_TRANSFER",
            Error::CrcMismatch => "CRC_MISMATCH",
            Error::CommandRejected => "COMMAND_REJECTED",
            Error::Timeout(_) => "TIMEOUT",
            Error::ParseError => "PARSE_ERROR",
            Error::SizeError => "SIZE_ERROR",
            Error::NotFound => "NOT_FOUND",
        }
    }

    /// Error message
    pub fn msg(self) -> &'static str {
        match self {
            Error::PcscError { .. } => "PC/SC error",
            Error::Channel { .. } => "HID channel I/O error",
            Error::ChannelClosed => "HID channel closed",
            Error::ResponseTooShort => "response too short",
            Error::Status(sw) => sw.msg(),
            Error::InvalidReport { .. } => "incorrect feature report size",
            Error::IncompleteTransfer => "incomplete transfer",
            Error::CrcMismatch => "checksum mismatch",
            Error::CommandRejected => "command rejected: no data",
            Error::Timeout(TimeoutKind::Touch) => "timed out waiting for touch",
            Error::Timeout(TimeoutKind::Cancelled) => "command cancelled",
            Error::Timeout(TimeoutKind::NotReady) => {
                "timed out waiting for device to become ready to receive"
            }
            Error::ParseError => "parse error",
            Error::SizeError => "size error",
            Error::NotFound => "not found",
        }
    }

    /// Is this a status word error?
    pub fn status(self) -> Option<StatusError> {
        match self {
            Error::Status(sw) => Some(sw),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PcscError {
                inner: Some(pcsc_error),
            } => write!(f, "{}: {}", self.msg(), pcsc_error),
            Error::Channel { kind } => write!(f, "{}: {}", self.msg(), kind),
            Error::Status(sw) => write!(f, "{} (SW={:04X})", sw.msg(), sw.code()),
            Error::InvalidReport { len } => {
                write!(f, "{}: got {}, want {}", self.msg(), len, crate::hid::REPORT_SIZE)
            }
            _ => f.write_str(self.msg()),
        }
    }
}

impl From<pcsc::Error> for Error {
    fn from(err: pcsc::Error) -> Error {
        Error::PcscError { inner: Some(err) }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        match err.kind() {
            io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected => Error::ChannelClosed,
            kind => Error::Channel { kind },
        }
    }
}

impl From<StatusError> for Error {
    fn from(sw: StatusError) -> Error {
        Error::Status(sw)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::PcscError {
                inner: Some(pcsc_error),
            } => Some(pcsc_error),
            _ => None,
        }
    }
}
