use crate::errors::TransportError;
use crate::rendezvous::RendezvousDescriptor;
use std::fs;
use std::io;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// One raw datagram pulled off a bound socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    /// Path of the sending socket. `None` for unbound (client) senders.
    pub sender: Option<PathBuf>,
}

/// Connectionless, filesystem-addressed datagram transport.
///
/// A bound transport owns a non-blocking socket at its rendezvous path and can
/// both send and drain. An unbound transport opens a throwaway socket for every
/// send and closes it before returning. Either way the socket is released when
/// the value is dropped.
#[derive(Debug)]
pub struct Transport {
    socket: Option<UnixDatagram>,
    local: Option<RendezvousDescriptor>,
}

impl Transport {
    /// Binds a server-side socket, replacing any stale file left at the path.
    pub fn bind(descriptor: &RendezvousDescriptor) -> Result<Self, TransportError> {
        let path = descriptor.path();
        let bind_error = |source| TransportError::Bind {
            path: path.to_path_buf(),
            source,
        };

        match fs::remove_file(path) {
            Ok(()) => warn!("Removed stale IPC socket file: {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(bind_error(e)),
        }

        let socket = UnixDatagram::bind(path).map_err(bind_error)?;
        socket.set_nonblocking(true).map_err(bind_error)?;
        info!(
            path = %path.display(),
            max_datagram_size = descriptor.max_datagram_size(),
            "Bound IPC socket"
        );

        Ok(Self {
            socket: Some(socket),
            local: Some(descriptor.clone()),
        })
    }

    /// A client-side transport with no persistent socket.
    pub fn unbound() -> Self {
        Self {
            socket: None,
            local: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.socket.is_some()
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local.as_ref().map(RendezvousDescriptor::path)
    }

    /// Sends one datagram to `recipient` without blocking.
    ///
    /// Oversized payloads are rejected before any socket is touched.
    pub fn send(&self, recipient: &RendezvousDescriptor, bytes: &[u8]) -> Result<usize, TransportError> {
        let max = recipient.max_datagram_size();
        if bytes.len() > max {
            return Err(TransportError::Overflow {
                path: recipient.path().to_path_buf(),
                len: bytes.len(),
                max,
            });
        }

        match &self.socket {
            Some(socket) => send_on(socket, recipient.path(), bytes),
            None => {
                let write_error = |e| TransportError::write(recipient.path().to_path_buf(), e);
                let socket = UnixDatagram::unbound().map_err(write_error)?;
                socket.set_nonblocking(true).map_err(write_error)?;
                send_on(&socket, recipient.path(), bytes)
                // `socket` is dropped (closed) here on every path
            }
        }
    }

    /// Drains every datagram currently queued on the bound socket, in arrival order.
    ///
    /// Returns as soon as the socket reports it would block, so an empty queue
    /// yields an empty vector immediately.
    pub fn receive(&self) -> Result<Vec<Datagram>, TransportError> {
        let (socket, local) = match (&self.socket, &self.local) {
            (Some(socket), Some(local)) => (socket, local),
            _ => return Err(TransportError::NotBound),
        };

        let max = local.max_datagram_size();
        // One spare byte so a datagram larger than the limit is detectable.
        let mut buffer = vec![0u8; max.saturating_add(1)];
        let mut received = Vec::new();

        loop {
            match socket.recv_from(&mut buffer) {
                Ok((len, addr)) => {
                    if len > max {
                        warn!(len, max, "Discarding datagram larger than the socket limit");
                        continue;
                    }
                    trace!("Read {} bytes from IPC socket", len);
                    received.push(Datagram {
                        bytes: buffer[..len].to_vec(),
                        sender: addr.as_pathname().map(Path::to_path_buf),
                    });
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::read(e)),
            }
        }

        if !received.is_empty() {
            debug!("Drained {} datagrams from {}", received.len(), local.path().display());
        }
        Ok(received)
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // The socket closes itself; the path is ours to clean up.
        if self.socket.take().is_some() {
            if let Some(local) = &self.local {
                if let Err(e) = fs::remove_file(local.path()) {
                    if e.kind() != io::ErrorKind::NotFound {
                        warn!("Failed to remove IPC socket file {}: {}", local.path().display(), e);
                    }
                }
            }
        }
    }
}

fn send_on(socket: &UnixDatagram, path: &Path, bytes: &[u8]) -> Result<usize, TransportError> {
    let sent = socket
        .send_to(bytes, path)
        .map_err(|e| TransportError::write(path.to_path_buf(), e))?;
    trace!("Sent {} bytes to {}", sent, path.display());
    Ok(sent)
}
