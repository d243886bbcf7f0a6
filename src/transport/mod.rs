//! Non-blocking TCP transport for LED hosts.
//!
//! One socket, one readiness poller, no threads. The caller drives
//! everything by ticking the [`Client`] event loop.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Client                   │
//! │   Dispatcher<Connection> + Lifecycle     │
//! └───────────────────┬──────────────────────┘
//!                     │ poll_once / next_line / take_event
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │               Connection                 │
//! │  mio::Poll ─ TcpStream ─ Session state   │
//! └─────────┬──────────────────────┬─────────┘
//!           ▼                      ▼
//!    ┌─────────────┐        ┌──────────────┐
//!    │ LineFramer  │        │OutboundQueue │
//!    │  (inbound)  │        │  (outbound)  │
//!    └─────────────┘        └──────────────┘
//! ```
//!
//! # Tick
//!
//! 1. Wait for readiness, zero timeout when the socket is already known to
//!    be readable, or writable with bytes queued.
//! 2. First writable event while connecting completes the connect.
//! 3. At most one bounded read; zero bytes closes the session.
//! 4. At most one write; the unaccepted suffix stays queued in order.
//! 5. Every complete line is parsed and dispatched in arrival order.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ledlink::transport::{Client, LogLifecycle};
//! use ledlink::{Config, Message};
//!
//! let config = Config::from_env();
//! let mut client = Client::connect(&config.connection, LogLifecycle)?;
//! client.on_type("led", |_, msg| {
//!     tracing::info!("{}", msg.brief());
//!     Ok(())
//! });
//! client.run()?;
//! ```

mod buffer;
mod client;
mod connection;

pub use buffer::{LineFramer, OutboundQueue, DEFAULT_MAX_LINE_BYTES};
pub use client::{Client, Lifecycle, LogLifecycle, DEFAULT_TICK};
pub use connection::{Connection, LinkEvent};
