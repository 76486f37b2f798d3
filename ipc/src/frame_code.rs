use crate::errors::FrameError;
use std::fmt;

/// Closed set of message-type tags carried in every frame.
///
/// Decoding an integer outside this set is a hard decode failure; the receiver
/// logs and discards such datagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FrameCode {
    /// Liveness probe, no payload
    Ping = 1,
    /// Payload is the sender's execution state label
    ExecutionStateReport = 2001,
}

impl FrameCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn label(self) -> &'static str {
        match self {
            FrameCode::Ping => "PING",
            FrameCode::ExecutionStateReport => "EXECUTION_STATE_REPORT",
        }
    }
}

impl TryFrom<u16> for FrameCode {
    type Error = FrameError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FrameCode::Ping),
            2001 => Ok(FrameCode::ExecutionStateReport),
            other => Err(FrameError::UnknownCode(other)),
        }
    }
}

impl fmt::Display for FrameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label(), self.as_u16())
    }
}
