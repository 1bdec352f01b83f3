//! Shared vocabulary for the pipe boundary between the I/O loop and the
//! session dispatcher.
//!
//! The transport reports every finished (or queued) read and write as a
//! [`CompletionStatus`]. The dispatcher answers each event with exactly one
//! [`Action`], which is the only instruction the I/O loop receives. Both types
//! carry the numeric codes used on the named-pipe side so that foreign loops
//! can exchange them without a translation table of their own.

use serde::{Deserialize, Serialize};

/// Status code reported for a completed operation.
pub const STATUS_SUCCESS: u32 = 0;
/// Status code reported when a read filled the buffer and more bytes wait.
pub const STATUS_MORE_DATA: u32 = 234;
/// Status code reported when an operation was queued asynchronously.
pub const STATUS_IO_PENDING: u32 = 997;
/// Status code emitted by [`CompletionStatus::code`] for generic failures.
pub const STATUS_FAILURE: u32 = 1;

/// Outcome of a transport operation, delivered with each completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// The operation completed and all transferred bytes are attached.
    Success,
    /// A read completed but the transport holds further bytes that are
    /// readable without issuing a new read.
    MoreData,
    /// The operation was queued; no bytes are available yet.
    IoPending,
    /// The operation failed.
    Failure,
}

impl CompletionStatus {
    /// Maps a raw pipe status code onto a completion status.
    ///
    /// Unknown codes are treated as failures.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            STATUS_SUCCESS => Self::Success,
            STATUS_MORE_DATA => Self::MoreData,
            STATUS_IO_PENDING => Self::IoPending,
            _ => Self::Failure,
        }
    }

    /// Returns the raw pipe status code for this status.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Success => STATUS_SUCCESS,
            Self::MoreData => STATUS_MORE_DATA,
            Self::IoPending => STATUS_IO_PENDING,
            Self::Failure => STATUS_FAILURE,
        }
    }

    /// Returns `true` when the event carries bytes that may be framed.
    #[must_use]
    pub const fn carries_data(self) -> bool {
        matches!(self, Self::Success | Self::MoreData)
    }
}

/// Directive returned by the dispatcher for every completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Wait for the next completion without issuing a new operation.
    NoAction,
    /// Issue the next read on the connection.
    NextRead,
    /// Write the attached reply.
    NextWrite,
    /// Close the connection. No further events may be delivered.
    CloseSocket,
}

impl Action {
    /// Returns the numeric code understood by pipe-side I/O loops.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::NoAction => 0,
            Self::NextRead => 1,
            Self::NextWrite => 2,
            Self::CloseSocket => 3,
        }
    }

    /// Parses a numeric action code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::NoAction),
            1 => Some(Self::NextRead),
            2 => Some(Self::NextWrite),
            3 => Some(Self::CloseSocket),
            _ => None,
        }
    }

    /// Returns `true` for the action that ends the connection.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::CloseSocket)
    }
}
