// Local datagram messaging between sibling daemon/worker processes.

pub mod errors; // Transport, frame and wait error types
pub mod frame; // Wire frame codec
pub mod frame_code; // Closed set of frame codes
pub mod receiver; // Bound inbox that dispatches frames into a sibling table
pub mod rendezvous; // Service name -> socket path resolution
pub mod sender; // Announce capability and the client-side Sender
pub mod transport; // Non-blocking Unix datagram transport
pub mod wait; // Dependency-wait helper

pub use errors::{FrameError, IpcError, TransportError, WaitError};
pub use frame::Frame;
pub use frame_code::FrameCode;
pub use receiver::{InboxEvent, PollReport, Receiver, SiblingReport, SiblingTable};
pub use rendezvous::{RendezvousDescriptor, SocketDirectory, DEFAULT_MAX_DATAGRAM_SIZE};
pub use sender::{Announce, Outbound, Sender};
pub use transport::{Datagram, Transport};
pub use wait::wait_for;
