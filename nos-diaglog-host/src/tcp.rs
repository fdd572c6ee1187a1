//! TCP drain transport
//!
//! Every accepted connection gets its own drain backed by a [`QueueSink`]. The
//! dispatch task fills the queue; [`TcpDrainServer::poll`] moves queued chunks
//! onto the socket, accepts new clients and releases the drains of clients
//! that went away. A new client first receives everything still retained in
//! the ring.
//!
//! Releasing a drain needs the context lock. When the dispatch task holds it
//! past the timeout, the handle is parked and the release is retried on every
//! poll, so a slot is never lost to a busy dispatcher.
//!
//! Input from clients is read and discarded; the stream is output only.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use nos_diaglog::{DiagError, DrainHandle, QueueSink};

use crate::HostContext;
use crate::config::HostConfig;
use crate::error::Result;

/// Longest a blocked client may stall a flush
const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// Release attempts made for parked drains when the server is dropped
const DROP_RELEASE_ATTEMPTS: usize = 50;

const REJECT_BANNER: &[u8] = b"diaglog: too many clients\r\n";

struct Client {
    stream: TcpStream,
    peer: SocketAddr,
    handle: DrainHandle,
    queue: Arc<QueueSink>,
}

impl Client {
    /// Whether the peer is still connected; drains and discards any input
    fn is_alive(&mut self) -> bool {
        let mut discard = [0u8; 64];
        if self.stream.set_nonblocking(true).is_err() {
            return false;
        }
        let alive = loop {
            match self.stream.read(&mut discard) {
                Ok(0) => break false,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break true,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break false,
            }
        };
        alive && self.stream.set_nonblocking(false).is_ok()
    }

    /// Write every queued chunk; returns the byte count or `None` on a broken socket
    fn flush(&mut self) -> Option<usize> {
        let mut written = 0;
        while let Some(chunk) = self.queue.pop() {
            if self.stream.write_all(&chunk).is_err() {
                return None;
            }
            written += chunk.len();
        }
        Some(written)
    }
}

/// Counters from one [`TcpDrainServer::poll`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollStats {
    pub accepted: usize,
    pub rejected: usize,
    pub disconnected: usize,
    pub bytes_sent: usize,
}

/// Streams the diagnostic log to TCP clients
pub struct TcpDrainServer {
    ctx: Arc<HostContext>,
    listener: TcpListener,
    max_clients: usize,
    clients: Vec<Client>,
    /// Drains of departed clients whose release timed out
    pending: Vec<DrainHandle>,
}

impl TcpDrainServer {
    /// Bind the listener from the host configuration
    pub fn bind(ctx: Arc<HostContext>, config: &HostConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.listen_addr)?;
        listener.set_nonblocking(true)?;
        host_info!("diagnostic log listening on {}", listener.local_addr()?);
        Ok(Self {
            ctx,
            listener,
            max_clients: config.max_clients,
            clients: Vec::new(),
            pending: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Drains still waiting to be released
    pub fn pending_releases(&self) -> usize {
        self.pending.len()
    }

    /// Accept pending clients, flush queued log bytes and drop dead clients
    pub fn poll(&mut self) -> Result<PollStats> {
        let mut stats = PollStats::default();
        self.retry_releases();

        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if self.attach(stream, peer) {
                        stats.accepted += 1;
                    } else {
                        stats.rejected += 1;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let mut index = 0;
        while index < self.clients.len() {
            let client = &mut self.clients[index];
            let sent = if client.is_alive() { client.flush() } else { None };
            match sent {
                Some(bytes) => {
                    stats.bytes_sent += bytes;
                    index += 1;
                }
                None => {
                    let client = self.clients.swap_remove(index);
                    self.detach(client);
                    stats.disconnected += 1;
                }
            }
        }

        Ok(stats)
    }

    fn attach(&mut self, mut stream: TcpStream, peer: SocketAddr) -> bool {
        if self.clients.len() >= self.max_clients {
            host_warn!("rejecting {}: client limit {} reached", peer, self.max_clients);
            let _ = stream.write_all(REJECT_BANNER);
            return false;
        }
        // Accepted sockets may inherit the listener's non-blocking mode
        if stream.set_nonblocking(false).is_err() || stream.set_write_timeout(Some(WRITE_TIMEOUT)).is_err() {
            return false;
        }

        let queue: Arc<QueueSink> = Arc::new(QueueSink::new());
        match self.ctx.reserve(queue.clone()) {
            Ok(handle) => {
                host_info!("{} attached as {}", peer, handle);
                self.clients.push(Client { stream, peer, handle, queue });
                true
            }
            Err(DiagError::RegistryFull) => {
                host_warn!("rejecting {}: no free drain slot", peer);
                let _ = stream.write_all(REJECT_BANNER);
                false
            }
            Err(err) => {
                host_warn!("rejecting {}: {}", peer, err);
                false
            }
        }
    }

    fn detach(&mut self, client: Client) {
        let dropped = client.queue.dropped();
        host_info!("{} detached from {}, {} bytes dropped", client.peer, client.handle, dropped);
        if self.release(client.handle) {
            self.pending.push(client.handle);
        }
    }

    /// Release a drain; `true` when the lock timed out and it must be retried
    fn release(&self, handle: DrainHandle) -> bool {
        match self.ctx.try_release(handle) {
            Ok(_) => false,
            Err(err) => {
                host_debug!("release of {} deferred: {}", handle, err);
                true
            }
        }
    }

    fn retry_releases(&mut self) {
        let mut pending = core::mem::take(&mut self.pending);
        pending.retain(|&handle| self.release(handle));
        self.pending = pending;
    }
}

impl Drop for TcpDrainServer {
    fn drop(&mut self) {
        for client in core::mem::take(&mut self.clients) {
            self.detach(client);
        }
        for _ in 0..DROP_RELEASE_ATTEMPTS {
            if self.pending.is_empty() {
                return;
            }
            self.retry_releases();
        }
        host_warn!("{} drains left registered", self.pending.len());
    }
}
