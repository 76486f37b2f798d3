use crate::errors::FrameError;
use crate::frame_code::FrameCode;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use coord_core::{ExecutionState, ServiceName};
use std::io::{Cursor, Read, Write};

/// Leading byte of every encoded frame
pub const FRAME_VERSION: u8 = 1;

const MAX_SERVICE_TAG_LEN: usize = u8::MAX as usize;
const MAX_MESSAGE_LEN: usize = u16::MAX as usize;
const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

/// Structured form of one datagram.
///
/// Wire layout, big-endian:
///
/// ```text
/// u8  version (= FRAME_VERSION)
/// u16 frame code
/// u32 sender pid (non-zero)
/// u8  service tag length, then that many UTF-8 bytes (0 = no service)
/// u16 message length, then UTF-8 message text
/// u8  payload present (0 or 1), then if present u32 length and the bytes
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message: String,
    pub sender_pid: u32,
    pub sender_service: Option<ServiceName>,
    pub code: FrameCode,
    pub payload: Option<Vec<u8>>,
}

impl Frame {
    pub fn new(code: FrameCode, message: impl Into<String>, sender_pid: u32) -> Self {
        Self {
            message: message.into(),
            sender_pid,
            sender_service: None,
            code,
            payload: None,
        }
    }

    pub fn with_service(mut self, service: ServiceName) -> Self {
        self.sender_service = Some(service);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Parses the payload as an execution state label.
    pub fn execution_state(&self) -> Option<ExecutionState> {
        self.payload.as_deref().and_then(ExecutionState::from_payload)
    }

    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        if self.sender_pid == 0 {
            return Err(FrameError::InvalidPid(0));
        }
        let service_tag = self.sender_service.map(|s| s.as_str()).unwrap_or("");
        check_len("sender_service", service_tag.len(), MAX_SERVICE_TAG_LEN)?;
        check_len("message", self.message.len(), MAX_MESSAGE_LEN)?;
        if let Some(payload) = &self.payload {
            check_len("payload", payload.len(), MAX_PAYLOAD_LEN)?;
        }

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.write_u8(FRAME_VERSION)?;
        buf.write_u16::<BigEndian>(self.code.as_u16())?;
        buf.write_u32::<BigEndian>(self.sender_pid)?;
        buf.write_u8(service_tag.len() as u8)?;
        buf.write_all(service_tag.as_bytes())?;
        buf.write_u16::<BigEndian>(self.message.len() as u16)?;
        buf.write_all(self.message.as_bytes())?;
        match &self.payload {
            Some(payload) => {
                buf.write_u8(1)?;
                buf.write_u32::<BigEndian>(payload.len() as u32)?;
                buf.write_all(payload)?;
            }
            None => buf.write_u8(0)?,
        }
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        let mut cursor = Cursor::new(data);

        let version = cursor.read_u8()?;
        if version != FRAME_VERSION {
            return Err(FrameError::UnsupportedVersion(version));
        }

        let code = FrameCode::try_from(cursor.read_u16::<BigEndian>()?)?;

        let sender_pid = cursor.read_u32::<BigEndian>()?;
        if sender_pid == 0 {
            return Err(FrameError::InvalidPid(sender_pid));
        }

        let tag_len = cursor.read_u8()? as usize;
        let sender_service = if tag_len == 0 {
            None
        } else {
            let tag = read_string(&mut cursor, tag_len, "sender_service")?;
            Some(tag.parse().map_err(|_| FrameError::UnknownService(tag))?)
        };

        let message_len = cursor.read_u16::<BigEndian>()? as usize;
        let message = read_string(&mut cursor, message_len, "message")?;

        let payload = match cursor.read_u8()? {
            0 => None,
            1 => {
                let payload_len = cursor.read_u32::<BigEndian>()? as usize;
                let remaining = data.len() - cursor.position() as usize;
                // The declared length must fit in what is left of the datagram.
                check_len("payload", payload_len, remaining)?;
                let mut payload = vec![0u8; payload_len];
                cursor.read_exact(&mut payload)?;
                Some(payload)
            }
            other => return Err(FrameError::InvalidPayloadFlag(other)),
        };

        let trailing = data.len() - cursor.position() as usize;
        if trailing != 0 {
            return Err(FrameError::TrailingBytes(trailing));
        }

        Ok(Self {
            message,
            sender_pid,
            sender_service,
            code,
            payload,
        })
    }

    fn encoded_len(&self) -> usize {
        let service_len = self.sender_service.map(|s| s.as_str().len()).unwrap_or(0);
        let payload_len = self.payload.as_ref().map(|p| 4 + p.len()).unwrap_or(0);
        1 + 2 + 4 + 1 + service_len + 2 + self.message.len() + 1 + payload_len
    }
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), FrameError> {
    if len > max {
        return Err(FrameError::FieldTooLong { field, len, max });
    }
    Ok(())
}

fn read_string(cursor: &mut Cursor<&[u8]>, len: usize, field: &'static str) -> Result<String, FrameError> {
    let mut bytes = vec![0u8; len];
    cursor.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| FrameError::InvalidUtf8(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_report() -> Frame {
        Frame::new(FrameCode::ExecutionStateReport, "worker-B", 4242)
            .with_service(ServiceName::Worker)
            .with_payload("working")
    }

    #[test]
    fn test_round_trip_full_frame() {
        let frame = state_report();
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes.len(), frame.encoded_len());
        assert_eq!(Frame::decode(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_round_trip_keeps_empty_and_absent_apart() {
        let bare = Frame::new(FrameCode::Ping, "", 1);
        let empty_payload = bare.clone().with_payload(Vec::new());

        assert_eq!(Frame::decode(&bare.encode().unwrap()).unwrap(), bare);
        assert_eq!(Frame::decode(&empty_payload.encode().unwrap()).unwrap(), empty_payload);
        assert_ne!(bare.encode().unwrap(), empty_payload.encode().unwrap());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        assert_eq!(state_report().encode().unwrap(), state_report().encode().unwrap());
    }

    #[test]
    fn test_layout_prefix() {
        let bytes = Frame::new(FrameCode::ExecutionStateReport, "w", 2).encode().unwrap();
        assert_eq!(
            bytes,
            vec![FRAME_VERSION, 0x07, 0xD1, 0, 0, 0, 2, 0, 0, 1, b'w', 0]
        );
    }

    #[test]
    fn test_every_truncation_fails() {
        let bytes = state_report().encode().unwrap();
        for len in 0..bytes.len() {
            assert!(Frame::decode(&bytes[..len]).is_err(), "prefix of {} bytes decoded", len);
        }
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        let mut bytes = state_report().encode().unwrap();
        bytes[1] = 0x7f;
        assert!(matches!(Frame::decode(&bytes), Err(FrameError::UnknownCode(_))));
    }

    #[test]
    fn test_unknown_service_tag_is_rejected() {
        let mut bytes = Frame::new(FrameCode::Ping, "", 7)
            .with_service(ServiceName::Daemon)
            .encode()
            .unwrap();
        // "daemon" -> "dxemon"
        bytes[9] = b'x';
        assert!(matches!(Frame::decode(&bytes), Err(FrameError::UnknownService(_))));
    }

    #[test]
    fn test_zero_pid_is_rejected() {
        assert!(matches!(
            Frame::new(FrameCode::Ping, "", 0).encode(),
            Err(FrameError::InvalidPid(0))
        ));
        let mut bytes = Frame::new(FrameCode::Ping, "", 1).encode().unwrap();
        bytes[6] = 0;
        assert!(matches!(Frame::decode(&bytes), Err(FrameError::InvalidPid(0))));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = state_report().encode().unwrap();
        bytes.push(0);
        assert!(matches!(Frame::decode(&bytes), Err(FrameError::TrailingBytes(1))));
    }

    #[test]
    fn test_oversized_message_cannot_encode() {
        let frame = Frame::new(FrameCode::Ping, "x".repeat(MAX_MESSAGE_LEN + 1), 1);
        assert!(matches!(
            frame.encode(),
            Err(FrameError::FieldTooLong { field: "message", .. })
        ));
    }

    #[test]
    fn test_execution_state_payload() {
        assert_eq!(state_report().execution_state(), Some(ExecutionState::Working));
        assert_eq!(Frame::new(FrameCode::Ping, "", 1).execution_state(), None);
    }
}
