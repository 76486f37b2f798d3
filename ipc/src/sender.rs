use crate::errors::IpcError;
use crate::frame::Frame;
use crate::frame_code::FrameCode;
use crate::rendezvous::SocketDirectory;
use crate::transport::Transport;
use coord_core::{ServiceName, StateHandle};
use tracing::debug;

/// What a caller can hand to [`Announce::send_message`].
#[derive(Debug, Clone, Copy)]
pub enum Outbound<'a> {
    Frame(&'a Frame),
    /// Already-encoded bytes, sent as-is
    Raw(&'a [u8]),
}

impl<'a> From<&'a Frame> for Outbound<'a> {
    fn from(frame: &'a Frame) -> Self {
        Outbound::Frame(frame)
    }
}

impl<'a> From<&'a [u8]> for Outbound<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Outbound::Raw(bytes)
    }
}

impl<'a> From<&'a str> for Outbound<'a> {
    fn from(text: &'a str) -> Self {
        Outbound::Raw(text.as_bytes())
    }
}

/// Capability to announce events to a named sibling service.
///
/// Implementors supply the transport, the directory used to resolve service
/// names and the state holder to report; the messaging methods come for free.
pub trait Announce {
    fn transport(&self) -> &Transport;

    fn directory(&self) -> &SocketDirectory;

    fn state(&self) -> &StateHandle;

    /// Identity stamped on outgoing frames. Only receivers have one.
    fn service_identity(&self) -> Option<ServiceName> {
        None
    }

    fn prepare_frame(&self, message: &str, code: FrameCode, payload: Option<Vec<u8>>) -> Frame {
        Frame {
            message: message.to_string(),
            sender_pid: std::process::id(),
            sender_service: self.service_identity(),
            code,
            payload,
        }
    }

    fn send_message<'a>(
        &self,
        recipient: ServiceName,
        message: impl Into<Outbound<'a>>,
    ) -> Result<(), IpcError> {
        let descriptor = self.directory().descriptor(recipient);
        let encoded;
        let bytes = match message.into() {
            Outbound::Frame(frame) => {
                encoded = frame.encode()?;
                encoded.as_slice()
            }
            Outbound::Raw(bytes) => bytes,
        };

        self.transport().send(&descriptor, bytes)?;
        debug!(%recipient, len = bytes.len(), "Sent IPC message");
        Ok(())
    }

    /// Reports the current execution state to `recipient`, labelled `who_am_i`.
    fn send_current_state(&self, recipient: ServiceName, who_am_i: &str) -> Result<(), IpcError> {
        let state = self.state().get();
        let frame = self.prepare_frame(
            who_am_i,
            FrameCode::ExecutionStateReport,
            Some(state.as_str().as_bytes().to_vec()),
        );
        self.send_message(recipient, &frame)
    }

    fn send_ping(&self, recipient: ServiceName, who_am_i: &str) -> Result<(), IpcError> {
        let frame = self.prepare_frame(who_am_i, FrameCode::Ping, None);
        self.send_message(recipient, &frame)
    }
}

/// Client-side sender with no socket of its own.
#[derive(Debug)]
pub struct Sender {
    transport: Transport,
    directory: SocketDirectory,
    state: StateHandle,
}

impl Sender {
    pub fn new(directory: SocketDirectory, state: StateHandle) -> Self {
        Self {
            transport: Transport::unbound(),
            directory,
            state,
        }
    }
}

impl Announce for Sender {
    fn transport(&self) -> &Transport {
        &self.transport
    }

    fn directory(&self) -> &SocketDirectory {
        &self.directory
    }

    fn state(&self) -> &StateHandle {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use coord_core::ExecutionState;
    use std::num::NonZeroUsize;
    use tempfile::tempdir;

    #[test]
    fn test_prepare_frame_without_identity() {
        let dir = tempdir().unwrap();
        let sender = Sender::new(SocketDirectory::new(dir.path()), StateHandle::default());

        let frame = sender.prepare_frame("worker-A", FrameCode::Ping, None);
        assert_eq!(frame.sender_pid, std::process::id());
        assert_eq!(frame.sender_service, None);
        assert_eq!(frame.message, "worker-A");
    }

    #[test]
    fn test_send_current_state_reaches_bound_socket() {
        let dir = tempdir().unwrap();
        let directory = SocketDirectory::new(dir.path());
        let inbox = Transport::bind(&directory.descriptor(ServiceName::Daemon)).unwrap();
        let state = StateHandle::new(ExecutionState::Idle);
        let sender = Sender::new(directory, state);

        sender.send_current_state(ServiceName::Daemon, "worker-A").unwrap();

        let drained = inbox.receive().unwrap();
        assert_eq!(drained.len(), 1);
        let frame = Frame::decode(&drained[0].bytes).unwrap();
        assert_eq!(frame.code, FrameCode::ExecutionStateReport);
        assert_eq!(frame.execution_state(), Some(ExecutionState::Idle));
    }

    #[test]
    fn test_raw_message_is_sent_verbatim() {
        let dir = tempdir().unwrap();
        let directory = SocketDirectory::new(dir.path());
        let inbox = Transport::bind(&directory.descriptor(ServiceName::Daemon)).unwrap();
        let sender = Sender::new(directory, StateHandle::default());

        sender.send_message(ServiceName::Daemon, "plain text").unwrap();

        assert_eq!(inbox.receive().unwrap()[0].bytes, b"plain text".to_vec());
    }

    #[test]
    fn test_write_error_is_propagated() {
        let dir = tempdir().unwrap();
        let sender = Sender::new(SocketDirectory::new(dir.path()), StateHandle::default());

        let err = sender.send_ping(ServiceName::Daemon, "worker-A").unwrap_err();
        assert!(matches!(err, IpcError::Transport(TransportError::Write { .. })));
    }

    #[test]
    fn test_frame_larger_than_limit_overflows() {
        let dir = tempdir().unwrap();
        let directory =
            SocketDirectory::new(dir.path()).with_max_datagram_size(NonZeroUsize::new(16).unwrap());
        let sender = Sender::new(directory, StateHandle::default());

        let err = sender
            .send_current_state(ServiceName::Daemon, "a-rather-long-worker-label")
            .unwrap_err();
        assert!(matches!(err, IpcError::Transport(TransportError::Overflow { .. })));
    }
}
