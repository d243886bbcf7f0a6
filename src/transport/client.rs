//! Event-loop driven LED host client.

use std::time::{Duration, Instant};

use super::connection::{Connection, LinkEvent};
use crate::codec::parse_line;
use crate::config::ConnectionConfig;
use crate::error::{LedError, Result};
use crate::protocol::{Dispatcher, Message, Session};

/// Readiness wait used by bounded loops when none is configured
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Connection lifecycle notifications.
///
/// Every method has a logging default, so implementors override only what
/// they care about.
pub trait Lifecycle {
    /// The connect completed
    fn on_connect(&mut self, session: &Session) {
        tracing::info!("Connected to {}", session.addr());
    }

    /// The connect did not complete
    fn on_connect_failed(&mut self, session: &Session, error: &LedError) {
        tracing::warn!("Could not connect to {}: {}", session.addr(), error);
    }

    /// The connected session ended. Called at most once per session.
    fn on_disconnect(&mut self, session: &Session) {
        tracing::info!("Disconnected from {}", session.addr());
    }

    /// A line could not be parsed, or a handler failed
    fn on_protocol_error(&mut self, session: &Session, error: &LedError) {
        tracing::warn!("Protocol error from {}: {}", session.addr(), error);
    }
}

/// [`Lifecycle`] that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLifecycle;

impl Lifecycle for LogLifecycle {}

/// LED host client.
///
/// Owns one [`Connection`], a [`Dispatcher`] whose handlers receive that
/// connection, and a [`Lifecycle`] observer. Nothing happens unless the
/// caller drives [`loop_once`](Self::loop_once) or one of the helpers built
/// on it.
///
/// # Example
///
/// ```rust,ignore
/// use ledlink::{Client, Config, LogLifecycle, Message};
///
/// let mut client = Client::connect(&Config::default().connection, LogLifecycle)?;
/// client.on("led", "ok", |_, msg| {
///     println!("{}", msg.brief());
///     Ok(())
/// });
/// client.run_until(|c| c.is_ready(), None)?;
/// client.send(&Message::new("led")?.with_objects([0]).with_value("r", 255u8))?;
/// client.flush()?;
/// ```
pub struct Client<L: Lifecycle = LogLifecycle> {
    conn: Connection,
    dispatcher: Dispatcher<Connection>,
    lifecycle: L,
}

impl<L: Lifecycle> std::fmt::Debug for Client<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("conn", &self.conn)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl<L: Lifecycle> Client<L> {
    /// Start connecting to the configured host.
    ///
    /// Completion is reported to `lifecycle` from a later tick. Errors that
    /// happen before the socket exists are reported and returned here.
    pub fn connect(config: &ConnectionConfig, mut lifecycle: L) -> Result<Self> {
        match Connection::connect(config) {
            Ok(conn) => Ok(Self::with_connection(conn, lifecycle)),
            Err(err) => {
                lifecycle.on_connect_failed(&Session::new(&config.host, config.port), &err);
                Err(err)
            },
        }
    }

    /// Wrap an existing connection
    pub fn with_connection(conn: Connection, lifecycle: L) -> Self {
        Self {
            conn,
            dispatcher: Dispatcher::new(),
            lifecycle,
        }
    }

    /// Register a handler for `:msg_type:subtype`
    pub fn on<F>(&mut self, msg_type: &str, subtype: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut Connection, &Message) -> Result<()> + 'static,
    {
        self.dispatcher.on(msg_type, subtype, handler);
        self
    }

    /// Register a handler for every subtype of `:msg_type`
    pub fn on_type<F>(&mut self, msg_type: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut Connection, &Message) -> Result<()> + 'static,
    {
        self.dispatcher.on_type(msg_type, handler);
        self
    }

    /// Register the catch-all handler
    pub fn on_any<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(&mut Connection, &Message) -> Result<()> + 'static,
    {
        self.dispatcher.on_any(handler);
        self
    }

    /// Handler registry
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<Connection> {
        &mut self.dispatcher
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Underlying connection, mutable
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Lifecycle observer
    pub fn lifecycle(&self) -> &L {
        &self.lifecycle
    }

    /// Lifecycle observer, mutable
    pub fn lifecycle_mut(&mut self) -> &mut L {
        &mut self.lifecycle
    }

    /// Session state
    pub fn session(&self) -> &Session {
        self.conn.session()
    }

    /// Whether `:hi:welcome` has arrived
    pub fn is_ready(&self) -> bool {
        self.conn.is_ready()
    }

    /// Configured host
    pub fn host(&self) -> &str {
        self.conn.host()
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.conn.port()
    }

    /// One event-loop tick: wait for readiness, do the I/O, then dispatch
    /// every complete line in arrival order.
    ///
    /// Fails with [`LedError::Disconnected`] on the tick that observes the
    /// close and on every call after it.
    pub fn loop_once(&mut self) -> Result<()> {
        let tick = self.conn.poll_once();
        self.process();
        tick?;
        self.check_open()
    }

    /// Queue a message and run one tick
    pub fn send(&mut self, message: &Message) -> Result<()> {
        let queued = self.conn.send(message);
        self.process();
        queued?;
        self.check_open()
    }

    /// Tick until every queued byte has been accepted by the socket
    pub fn flush(&mut self) -> Result<()> {
        while self.conn.unsent() > 0 {
            self.loop_once()?;
        }
        Ok(())
    }

    /// Tick until `done` holds or `deadline` passes.
    ///
    /// Returns whether `done` was reached. The readiness wait is shortened
    /// so a deadline is never overshot by more than one tick.
    pub fn run_until<F>(&mut self, mut done: F, deadline: Option<Instant>) -> Result<bool>
    where
        F: FnMut(&Self) -> bool,
    {
        let configured = self.conn.timeout();
        let result = loop {
            if done(self) {
                break Ok(true);
            }
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    break Ok(false);
                }
                let left = deadline - now;
                self.conn
                    .set_timeout(Some(configured.map_or(left, |t| t.min(left))));
            }
            if let Err(err) = self.loop_once() {
                break Err(err);
            }
        };
        self.conn.set_timeout(configured);
        result
    }

    /// Tick until the session ends. A disconnect is a normal return.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.loop_once() {
                Ok(()) => {},
                Err(LedError::Disconnected { .. }) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    /// Close the session and report it
    pub fn disconnect(&mut self) {
        self.conn.disconnect();
        self.process();
    }

    fn check_open(&self) -> Result<()> {
        if self.conn.session().is_closed() {
            return Err(LedError::Disconnected {
                unsent: self.conn.unsent(),
            });
        }
        Ok(())
    }

    fn process(&mut self) {
        self.report_events();
        while let Some(line) = self.conn.next_line() {
            match line.and_then(|l| parse_line(&l)) {
                Ok(Some(message)) => self.dispatch(message),
                Ok(None) => {},
                Err(err) => {
                    let err = LedError::from(err);
                    self.lifecycle.on_protocol_error(self.conn.session(), &err);
                },
            }
            self.report_events();
        }
    }

    fn dispatch(&mut self, message: Message) {
        if message.is_handshake() && !self.conn.is_ready() {
            self.conn.session_mut().mark_ready();
            tracing::info!("Session with {} is ready", self.conn.session().addr());
        }

        match self.dispatcher.dispatch(&mut self.conn, &message) {
            Ok(Some(_)) => {},
            Ok(None) => tracing::info!("Unhandled message\n{}", message.report()),
            Err(err) if err.is_fatal() => {
                tracing::debug!("Handler for {} stopped: {}", message.prefixes(), err);
            },
            Err(err) => self.lifecycle.on_protocol_error(self.conn.session(), &err),
        }
    }

    fn report_events(&mut self) {
        while let Some(event) = self.conn.take_event() {
            let session = self.conn.session();
            match event {
                LinkEvent::Connected => self.lifecycle.on_connect(session),
                LinkEvent::ConnectFailed(source) => {
                    let err = LedError::ConnectFailed {
                        addr: session.addr(),
                        source,
                    };
                    self.lifecycle.on_connect_failed(session, &err);
                },
                LinkEvent::Disconnected { .. } => self.lifecycle.on_disconnect(session),
            }
        }
    }
}
