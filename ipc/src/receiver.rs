use crate::errors::TransportError;
use crate::frame::Frame;
use crate::frame_code::FrameCode;
use crate::rendezvous::SocketDirectory;
use crate::sender::Announce;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use coord_core::{ExecutionState, ServiceName, StateHandle};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Latest known status of one sibling, keyed by its self-reported label.
#[derive(Debug, Clone, PartialEq)]
pub struct SiblingReport {
    pub service: Option<ServiceName>,
    pub pid: u32,
    /// `None` until the sibling sends a state report (pings alone don't set it)
    pub state: Option<ExecutionState>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Default, Clone)]
pub struct SiblingTable {
    entries: BTreeMap<String, SiblingReport>,
}

impl SiblingTable {
    pub fn get(&self, sender: &str) -> Option<&SiblingReport> {
        self.entries.get(sender)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SiblingReport)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn record_state(&mut self, frame: &Frame, state: ExecutionState) {
        self.entries.insert(
            frame.message.clone(),
            SiblingReport {
                service: frame.sender_service,
                pid: frame.sender_pid,
                state: Some(state),
                last_seen: Utc::now(),
            },
        );
    }

    fn record_ping(&mut self, frame: &Frame) {
        let now = Utc::now();
        self.entries
            .entry(frame.message.clone())
            .and_modify(|report| {
                report.pid = frame.sender_pid;
                report.service = frame.sender_service;
                report.last_seen = now;
            })
            .or_insert(SiblingReport {
                service: frame.sender_service,
                pid: frame.sender_pid,
                state: None,
                last_seen: now,
            });
    }
}

/// One successfully dispatched frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxEvent {
    StateReported {
        sender: String,
        service: Option<ServiceName>,
        pid: u32,
        state: ExecutionState,
    },
    Ping {
        sender: String,
        service: Option<ServiceName>,
        pid: u32,
    },
}

/// Outcome of one [`Receiver::poll_inbox`] cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Dispatched frames, in arrival order
    pub events: Vec<InboxEvent>,
    /// Datagrams that failed to decode
    pub rejected: usize,
    /// State reports whose payload was not a known execution state
    pub invalid_states: usize,
}

impl PollReport {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.rejected == 0 && self.invalid_states == 0
    }
}

/// Owns a bound transport for one service and turns its datagrams into
/// sibling state updates.
#[derive(Debug)]
pub struct Receiver {
    identity: ServiceName,
    transport: Transport,
    directory: SocketDirectory,
    state: StateHandle,
    siblings: SiblingTable,
    socket_path: PathBuf,
}

impl Receiver {
    /// Binds the rendezvous socket for `identity`. Failure here is fatal to a daemon.
    pub fn bind(
        identity: ServiceName,
        directory: SocketDirectory,
        state: StateHandle,
    ) -> Result<Self, TransportError> {
        let descriptor = directory.descriptor(identity);
        let transport = Transport::bind(&descriptor)?;
        let socket_path = descriptor.path().to_path_buf();
        info!(service = %identity, path = %socket_path.display(), "Receiver listening");

        Ok(Self {
            identity,
            transport,
            directory,
            state,
            siblings: SiblingTable::default(),
            socket_path,
        })
    }

    pub fn identity(&self) -> ServiceName {
        self.identity
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn siblings(&self) -> &SiblingTable {
        &self.siblings
    }

    pub fn clear_siblings(&mut self) {
        self.siblings.clear();
    }

    /// Drains the socket and dispatches every decodable frame.
    ///
    /// Per-datagram problems are logged and counted; only a failing drain
    /// returns an error.
    #[instrument(skip(self), fields(service = %self.identity))]
    pub fn poll_inbox(&mut self) -> Result<PollReport, TransportError> {
        let datagrams = self.transport.receive()?;
        let mut report = PollReport::default();

        for datagram in datagrams {
            let frame = match Frame::decode(&datagram.bytes) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(
                        error = %e,
                        len = datagram.bytes.len(),
                        sender = ?datagram.sender,
                        "Discarding undecodable datagram"
                    );
                    report.rejected += 1;
                    continue;
                }
            };

            match self.dispatch(frame) {
                Some(event) => report.events.push(event),
                None => report.invalid_states += 1,
            }
        }

        Ok(report)
    }

    fn dispatch(&mut self, frame: Frame) -> Option<InboxEvent> {
        match frame.code {
            FrameCode::ExecutionStateReport => {
                let Some(state) = frame.execution_state() else {
                    warn!(
                        sender = %frame.message,
                        pid = frame.sender_pid,
                        payload = ?frame.payload.as_deref().map(String::from_utf8_lossy),
                        "Invalid execution state reported"
                    );
                    return None;
                };
                info!(
                    "Sibling {} reported state {} from pid {}",
                    frame.message, state, frame.sender_pid
                );
                self.siblings.record_state(&frame, state);
                Some(InboxEvent::StateReported {
                    sender: frame.message,
                    service: frame.sender_service,
                    pid: frame.sender_pid,
                    state,
                })
            }
            FrameCode::Ping => {
                debug!(sender = %frame.message, pid = frame.sender_pid, "Ping received");
                self.siblings.record_ping(&frame);
                Some(InboxEvent::Ping {
                    sender: frame.message,
                    service: frame.sender_service,
                    pid: frame.sender_pid,
                })
            }
        }
    }
}

impl Announce for Receiver {
    fn transport(&self) -> &Transport {
        &self.transport
    }

    fn directory(&self) -> &SocketDirectory {
        &self.directory
    }

    fn state(&self) -> &StateHandle {
        &self.state
    }

    fn service_identity(&self) -> Option<ServiceName> {
        Some(self.identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::Sender;
    use tempfile::tempdir;

    #[test]
    fn test_receiver_stamps_its_identity() {
        let dir = tempdir().unwrap();
        let receiver = Receiver::bind(
            ServiceName::Scheduler,
            SocketDirectory::new(dir.path()),
            StateHandle::default(),
        )
        .unwrap();

        let frame = receiver.prepare_frame("scheduler", FrameCode::Ping, None);
        assert_eq!(frame.sender_service, Some(ServiceName::Scheduler));
        assert_eq!(receiver.socket_path(), dir.path().join("scheduler.ipc").as_path());
    }

    #[test]
    fn test_invalid_state_is_counted_not_recorded() {
        let dir = tempdir().unwrap();
        let directory = SocketDirectory::new(dir.path());
        let mut receiver =
            Receiver::bind(ServiceName::Daemon, directory.clone(), StateHandle::default()).unwrap();
        let sender = Sender::new(directory, StateHandle::default());

        let bogus = sender.prepare_frame(
            "worker-A",
            FrameCode::ExecutionStateReport,
            Some(b"dancing".to_vec()),
        );
        sender.send_message(ServiceName::Daemon, &bogus).unwrap();
        sender.send_current_state(ServiceName::Daemon, "worker-A").unwrap();

        let report = receiver.poll_inbox().unwrap();
        assert_eq!(report.invalid_states, 1);
        assert_eq!(report.events.len(), 1);
        assert_eq!(
            receiver.siblings().get("worker-A").and_then(|r| r.state),
            Some(ExecutionState::Started)
        );
    }

    #[test]
    fn test_ping_keeps_last_reported_state() {
        let dir = tempdir().unwrap();
        let directory = SocketDirectory::new(dir.path());
        let mut receiver =
            Receiver::bind(ServiceName::Daemon, directory.clone(), StateHandle::default()).unwrap();
        let state = StateHandle::new(ExecutionState::Working);
        let sender = Sender::new(directory, state);

        sender.send_ping(ServiceName::Daemon, "worker-A").unwrap();
        receiver.poll_inbox().unwrap();
        assert_eq!(receiver.siblings().get("worker-A").unwrap().state, None);

        sender.send_current_state(ServiceName::Daemon, "worker-A").unwrap();
        sender.send_ping(ServiceName::Daemon, "worker-A").unwrap();
        let report = receiver.poll_inbox().unwrap();

        assert_eq!(report.events.len(), 2);
        assert_eq!(
            receiver.siblings().get("worker-A").unwrap().state,
            Some(ExecutionState::Working)
        );
        receiver.clear_siblings();
        assert!(receiver.siblings().is_empty());
    }
}
