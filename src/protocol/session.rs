//! Session state for one LED host connection.
//!
//! Tracks where the socket points, whether the host has greeted us with
//! `:hi:welcome`, and simple traffic counters. The state lives exactly as
//! long as the socket.

use std::time::{Duration, Instant};

/// Session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Non-blocking connect in progress
    Connecting,
    /// Socket connected, exchanging lines
    Connected,
    /// Socket closed (terminal)
    Closed,
}

/// Session statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Lines framed from the inbound stream
    pub lines_received: u64,
    /// Messages queued for sending
    pub messages_sent: u64,
    /// Bytes read from the socket
    pub bytes_read: u64,
    /// Bytes accepted by the socket
    pub bytes_written: u64,
}

/// LED host session
#[derive(Debug, Clone)]
pub struct Session {
    /// Host name or address as configured
    host: String,
    /// TCP port
    port: u16,
    /// Current state
    state: SessionState,
    /// Set once the handshake arrived
    ready: bool,
    /// Creation time
    opened_at: Instant,
    /// Traffic counters
    stats: SessionStats,
}

impl Session {
    /// Create a session for `host:port` in the connecting state
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            state: SessionState::Connecting,
            ready: false,
            opened_at: Instant::now(),
            stats: SessionStats::default(),
        }
    }

    /// Configured host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the socket is connected
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Whether the session has ended
    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Whether the host has sent `:hi:welcome`
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Time since the session was created
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    /// Get session statistics
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub(crate) fn mark_connected(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Connected;
        }
    }

    pub(crate) fn mark_closed(&mut self) {
        self.state = SessionState::Closed;
    }

    pub(crate) fn mark_ready(&mut self) {
        self.ready = true;
    }

    pub(crate) fn record_read(&mut self, bytes: usize) {
        self.stats.bytes_read += bytes as u64;
    }

    pub(crate) fn record_written(&mut self, bytes: usize) {
        self.stats.bytes_written += bytes as u64;
    }

    pub(crate) fn record_line(&mut self) {
        self.stats.lines_received += 1;
    }

    pub(crate) fn record_sent(&mut self) {
        self.stats.messages_sent += 1;
    }
}
