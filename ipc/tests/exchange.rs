use coord_core::{ExecutionState, ServiceName, StateHandle};
use coord_ipc::{
    Announce, Frame, FrameCode, InboxEvent, Receiver, Sender, SocketDirectory, Transport,
    TransportError,
};
use std::num::NonZeroUsize;
use tempfile::tempdir;

fn daemon_and_worker(directory: &SocketDirectory) -> (Receiver, Sender, StateHandle) {
    let receiver = Receiver::bind(ServiceName::Daemon, directory.clone(), StateHandle::default())
        .expect("bind daemon socket");
    let worker_state = StateHandle::new(ExecutionState::Working);
    let sender = Sender::new(directory.clone(), worker_state.clone());
    (receiver, sender, worker_state)
}

#[test]
fn test_state_report_reaches_daemon_once() {
    let dir = tempdir().unwrap();
    let directory = SocketDirectory::new(dir.path());
    let (mut daemon, worker, _) = daemon_and_worker(&directory);
    assert_eq!(daemon.socket_path(), dir.path().join("daemon.ipc").as_path());

    worker.send_current_state(ServiceName::Daemon, "worker-B").unwrap();

    let first = daemon.poll_inbox().unwrap();
    assert_eq!(
        first.events,
        vec![InboxEvent::StateReported {
            sender: "worker-B".to_string(),
            service: None,
            pid: std::process::id(),
            state: ExecutionState::Working,
        }]
    );
    let sibling = daemon.siblings().get("worker-B").unwrap();
    assert_eq!(sibling.pid, std::process::id());
    assert_eq!(sibling.state, Some(ExecutionState::Working));

    let second = daemon.poll_inbox().unwrap();
    assert!(second.is_empty());
}

#[test]
fn test_state_changes_are_reported_in_order() {
    let dir = tempdir().unwrap();
    let directory = SocketDirectory::new(dir.path());
    let (mut daemon, worker, worker_state) = daemon_and_worker(&directory);

    for state in [ExecutionState::Working, ExecutionState::Idle, ExecutionState::Stopping] {
        worker_state.set(state);
        worker.send_current_state(ServiceName::Daemon, "worker-B").unwrap();
    }

    let states: Vec<_> = daemon
        .poll_inbox()
        .unwrap()
        .events
        .into_iter()
        .map(|event| match event {
            InboxEvent::StateReported { state, .. } => state,
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(
        states,
        vec![ExecutionState::Working, ExecutionState::Idle, ExecutionState::Stopping]
    );
    assert_eq!(
        daemon.siblings().get("worker-B").unwrap().state,
        Some(ExecutionState::Stopping)
    );
}

#[test]
fn test_corrupt_datagram_does_not_break_the_drain() {
    let dir = tempdir().unwrap();
    let directory = SocketDirectory::new(dir.path());
    let (mut daemon, worker, _) = daemon_and_worker(&directory);

    let labels = ["worker-1", "worker-2", "worker-3", "worker-4"];
    for (i, label) in labels.iter().enumerate() {
        if i == 2 {
            worker.send_message(ServiceName::Daemon, "definitely not a frame").unwrap();
        }
        worker.send_current_state(ServiceName::Daemon, label).unwrap();
    }
    // A frame with an unknown code is rejected the same way.
    let mut unknown = worker
        .prepare_frame("worker-5", FrameCode::Ping, None)
        .encode()
        .unwrap();
    unknown[1..3].copy_from_slice(&9999u16.to_be_bytes());
    worker.send_message(ServiceName::Daemon, unknown.as_slice()).unwrap();

    let report = daemon.poll_inbox().unwrap();
    assert_eq!(report.rejected, 2);
    let senders: Vec<_> = report
        .events
        .iter()
        .map(|event| match event {
            InboxEvent::StateReported { sender, .. } => sender.as_str(),
            InboxEvent::Ping { sender, .. } => sender.as_str(),
        })
        .collect();
    assert_eq!(senders, labels);
}

#[test]
fn test_daemon_can_report_its_own_state_with_identity() {
    let dir = tempdir().unwrap();
    let directory = SocketDirectory::new(dir.path());
    let daemon = Receiver::bind(
        ServiceName::Daemon,
        directory.clone(),
        StateHandle::new(ExecutionState::Healing),
    )
    .unwrap();
    let mut scheduler =
        Receiver::bind(ServiceName::Scheduler, directory, StateHandle::default()).unwrap();

    daemon.send_current_state(ServiceName::Scheduler, "daemon").unwrap();

    let report = scheduler.poll_inbox().unwrap();
    assert_eq!(
        report.events,
        vec![InboxEvent::StateReported {
            sender: "daemon".to_string(),
            service: Some(ServiceName::Daemon),
            pid: std::process::id(),
            state: ExecutionState::Healing,
        }]
    );
}

#[test]
fn test_oversized_frame_fails_for_every_recipient() {
    let dir = tempdir().unwrap();
    let directory =
        SocketDirectory::new(dir.path()).with_max_datagram_size(NonZeroUsize::new(32).unwrap());
    let sender = Sender::new(directory.clone(), StateHandle::default());
    let frame = sender.prepare_frame("worker", FrameCode::ExecutionStateReport, Some(vec![0; 64]));

    // Nothing is bound, so an attempted send would fail with a write error instead.
    for service in ServiceName::ALL {
        let err = Transport::unbound()
            .send(&directory.descriptor(service), &frame.encode().unwrap())
            .unwrap_err();
        assert!(matches!(err, TransportError::Overflow { max: 32, .. }));
    }
    assert!(Frame::decode(&frame.encode().unwrap()).is_ok());
}
