//! Single-socket readiness multiplexer.
//!
//! A [`Connection`] owns one non-blocking TCP stream registered with its own
//! [`mio::Poll`] for both read and write readiness. Each [`poll_once`] waits
//! for readiness (bounded by the configured timeout), does at most one read
//! and one write, and leaves complete lines in the framer for the caller.
//!
//! mio reports edge-triggered readiness. The connection keeps sticky
//! `readable`/`writable` flags that are cleared only on `WouldBlock`, which
//! gives the level-triggered behaviour the protocol layer expects. While
//! work is pending the wait uses a zero timeout.
//!
//! [`poll_once`]: Connection::poll_once

use std::collections::VecDeque;
use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, ToSocketAddrs};
use std::time::Duration;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token};

use super::buffer::{LineFramer, OutboundQueue};
use crate::config::ConnectionConfig;
use crate::error::{LedError, ParseError, Result};
use crate::protocol::{Message, Session, SessionState};

const STREAM: Token = Token(0);

/// Transport-level happenings, drained by the owner after each tick.
#[derive(Debug)]
pub enum LinkEvent {
    /// The non-blocking connect completed
    Connected,
    /// The non-blocking connect failed; the session is closed
    ConnectFailed(io::Error),
    /// The session ended after being connected. Emitted once.
    Disconnected {
        /// Outbound bytes that never reached the socket
        unsent: usize,
    },
}

/// One LED host connection.
pub struct Connection {
    stream: TcpStream,
    poll: Poll,
    events: Events,
    session: Session,
    inbound: LineFramer,
    outbound: OutboundQueue,
    scratch: Vec<u8>,
    readable: bool,
    writable: bool,
    timeout: Option<Duration>,
    pending: VecDeque<LinkEvent>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("inbound", &self.inbound.pending())
            .field("outbound", &self.outbound.len())
            .field("readable", &self.readable)
            .field("writable", &self.writable)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Start a non-blocking connect to the configured host.
    ///
    /// Name resolution and immediate socket errors fail here; everything
    /// else is reported through [`LinkEvent`]s.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        let addr = resolve(&config.host, config.port)?;
        let stream = TcpStream::connect(addr).map_err(|source| LedError::ConnectFailed {
            addr: config.addr(),
            source,
        })?;
        tracing::debug!("Connecting to {} ({})", config.addr(), addr);
        Self::with_stream(stream, Session::new(&config.host, config.port), config)
    }

    /// Wrap an already connected std stream.
    ///
    /// The connect completes on the first writable tick like any other.
    pub fn from_std(stream: std::net::TcpStream, config: &ConnectionConfig) -> Result<Self> {
        let peer = stream.peer_addr()?;
        stream.set_nonblocking(true)?;
        let session = Session::new(&peer.ip().to_string(), peer.port());
        Self::with_stream(TcpStream::from_std(stream), session, config)
    }

    fn with_stream(
        mut stream: TcpStream,
        session: Session,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut stream, STREAM, Interest::READABLE | Interest::WRITABLE)?;

        Ok(Self {
            stream,
            poll,
            events: Events::with_capacity(16),
            session,
            inbound: LineFramer::new(config.max_line_bytes),
            outbound: OutboundQueue::new(),
            scratch: vec![0; config.read_chunk.max(1)],
            readable: false,
            writable: false,
            timeout: config.poll_timeout(),
            pending: VecDeque::new(),
        })
    }

    /// Session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Whether the host has sent its greeting
    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// Configured host
    pub fn host(&self) -> &str {
        self.session.host()
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.session.port()
    }

    /// Readiness wait bound; `None` blocks until something happens
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Change the readiness wait bound
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Bytes queued but not yet accepted by the socket
    pub fn unsent(&self) -> usize {
        self.outbound.len()
    }

    /// Take the oldest unreported transport event
    pub fn take_event(&mut self) -> Option<LinkEvent> {
        self.pending.pop_front()
    }

    /// Next complete inbound line, if any
    pub fn next_line(&mut self) -> Option<std::result::Result<String, ParseError>> {
        let line = self.inbound.next_line()?;
        if line.is_ok() {
            self.session.record_line();
        }
        Some(line)
    }

    /// Queue a message and run one tick.
    ///
    /// Part of the message may already be on the wire when this returns.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        if self.session.is_closed() {
            return Err(self.disconnected());
        }
        self.outbound.push(message.to_wire().as_bytes());
        self.session.record_sent();
        tracing::debug!("Queued {} ({} bytes pending)", message.prefixes(), self.outbound.len());
        self.poll_once()
    }

    /// Wait for readiness once and service it.
    ///
    /// Fails with [`LedError::Disconnected`] once the session is closed;
    /// no I/O is attempted then.
    pub fn poll_once(&mut self) -> Result<()> {
        if self.session.is_closed() {
            return Err(self.disconnected());
        }

        let timeout = if self.has_ready_work() {
            Some(Duration::ZERO)
        } else {
            self.timeout
        };
        if let Err(err) = self.poll.poll(&mut self.events, timeout) {
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err.into());
        }

        for event in self.events.iter() {
            if event.token() != STREAM {
                continue;
            }
            if event.is_readable() || event.is_read_closed() || event.is_error() {
                self.readable = true;
            }
            if event.is_writable() || event.is_write_closed() || event.is_error() {
                self.writable = true;
            }
        }

        if self.session.state() == SessionState::Connecting {
            if !self.writable {
                return Ok(());
            }
            self.finish_connect();
            if !self.session.is_connected() {
                return Ok(());
            }
        }

        if self.readable {
            self.read_ready();
        }
        if self.writable && !self.session.is_closed() {
            self.write_ready();
        }
        Ok(())
    }

    /// Close the session from this side. Reported like a peer close once
    /// connected; cancelling a pending connect produces no event.
    pub fn disconnect(&mut self) {
        if self.session.state() == SessionState::Connecting {
            tracing::info!("Connect to {} cancelled", self.session.addr());
            self.session.mark_closed();
            self.readable = false;
            self.writable = false;
            let _ = self.poll.registry().deregister(&mut self.stream);
            let _ = self.stream.shutdown(Shutdown::Both);
            return;
        }
        self.shut("closed locally");
    }

    fn has_ready_work(&self) -> bool {
        self.session.is_connected()
            && (self.readable || (self.writable && !self.outbound.is_empty()))
    }

    fn finish_connect(&mut self) {
        match self.stream.take_error() {
            Ok(Some(err)) | Err(err) => return self.fail_connect(err),
            Ok(None) => {},
        }
        match self.stream.peer_addr() {
            Ok(peer) => {
                self.session.mark_connected();
                tracing::info!("Connected to {} ({})", self.session.addr(), peer);
                self.pending.push_back(LinkEvent::Connected);
            },
            Err(err) if err.kind() == io::ErrorKind::NotConnected => {
                // Spurious wakeup, the handshake is still in flight
                self.writable = false;
            },
            Err(err) => self.fail_connect(err),
        }
    }

    fn fail_connect(&mut self, err: io::Error) {
        tracing::warn!("Connect to {} failed: {}", self.session.addr(), err);
        self.session.mark_closed();
        let _ = self.poll.registry().deregister(&mut self.stream);
        self.pending.push_back(LinkEvent::ConnectFailed(err));
    }

    fn read_ready(&mut self) {
        match self.stream.read(&mut self.scratch) {
            Ok(0) => self.shut("peer closed the connection"),
            Ok(n) => {
                self.session.record_read(n);
                self.inbound.push(&self.scratch[..n]);
                tracing::debug!("< {} bytes from {}", n, self.session.addr());
            },
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => self.readable = false,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
            Err(err) => self.shut(&format!("read failed: {err}")),
        }
    }

    fn write_ready(&mut self) {
        if self.outbound.is_empty() {
            return;
        }
        match self.outbound.write_to(&mut self.stream) {
            Ok(n) => {
                self.session.record_written(n);
                tracing::debug!(
                    "> {} bytes to {} ({} still queued)",
                    n,
                    self.session.addr(),
                    self.outbound.len()
                );
            },
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => self.writable = false,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {},
            Err(err) => self.shut(&format!("write failed: {err}")),
        }
    }

    fn shut(&mut self, reason: &str) {
        if self.session.is_closed() {
            return;
        }
        let connected = self.session.is_connected();
        self.session.mark_closed();
        self.readable = false;
        self.writable = false;
        let _ = self.poll.registry().deregister(&mut self.stream);
        let _ = self.stream.shutdown(Shutdown::Both);

        let unsent = self.outbound.len();
        if unsent > 0 {
            tracing::warn!(
                "Session to {} closed with {} unsent bytes",
                self.session.addr(),
                unsent
            );
        }
        tracing::info!("Disconnected from {}: {}", self.session.addr(), reason);
        if connected {
            self.pending.push_back(LinkEvent::Disconnected { unsent });
        } else {
            self.pending.push_back(LinkEvent::ConnectFailed(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                reason.to_string(),
            )));
        }
    }

    fn disconnected(&self) -> LedError {
        LedError::Disconnected {
            unsent: self.outbound.len(),
        }
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let addr = format!("{host}:{port}");
    (host, port)
        .to_socket_addrs()
        .map_err(|source| LedError::ConnectFailed {
            addr: addr.clone(),
            source,
        })?
        .next()
        .ok_or_else(|| LedError::ConnectFailed {
            addr,
            source: io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses"),
        })
}
