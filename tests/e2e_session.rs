//! End-to-end session tests.
//!
//! These tests run a real client against a loopback `TcpListener` peer and
//! verify handshake, dispatch, ordering and disconnect handling beyond the
//! unit test level.

use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use ledlink::protocol::SessionState;
use ledlink::{Client, ConnectionConfig, LedError, Lifecycle, Message, Session};

#[derive(Default)]
struct Recorder {
    connects: usize,
    disconnects: usize,
    errors: usize,
}

impl Lifecycle for Recorder {
    fn on_connect(&mut self, _: &Session) {
        self.connects += 1;
    }

    fn on_disconnect(&mut self, _: &Session) {
        self.disconnects += 1;
    }

    fn on_protocol_error(&mut self, _: &Session, _: &LedError) {
        self.errors += 1;
    }
}

fn listener() -> (TcpListener, ConnectionConfig) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let config = ConnectionConfig {
        host: "127.0.0.1".to_string(),
        port: listener.local_addr().unwrap().port(),
        poll_timeout_ms: Some(20),
        ..ConnectionConfig::default()
    };
    (listener, config)
}

fn within(secs: u64) -> Option<Instant> {
    Some(Instant::now() + Duration::from_secs(secs))
}

/// Test the greeting marks the session ready
#[test]
fn test_handshake_over_loopback() {
    let (listener, config) = listener();
    let mut client = Client::connect(&config, Recorder::default()).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    assert!(!client.is_ready());
    peer.write_all(b":hi:welcome //ledhost 1.0\r\n").unwrap();

    assert!(client.run_until(|c| c.is_ready(), within(5)).unwrap());
    assert_eq!(client.session().state(), SessionState::Connected);
    assert_eq!(client.lifecycle().connects, 1);
    assert_eq!(client.host(), "127.0.0.1");
    assert_eq!(client.port(), config.port);
}

/// Test routing precedence with real traffic
#[test]
fn test_dispatch_precedence() {
    let (listener, config) = listener();
    let mut client = Client::connect(&config, Recorder::default()).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let (exact, by_type, any) = (seen.clone(), seen.clone(), seen.clone());
    client
        .on("led", "ok", move |_, msg| {
            exact.borrow_mut().push(format!("exact {}", msg.prefixes()));
            Ok(())
        })
        .on_type("led", move |_, msg| {
            by_type.borrow_mut().push(format!("type {}", msg.prefixes()));
            Ok(())
        })
        .on_any(move |_, msg| {
            any.borrow_mut().push(format!("any {}", msg.prefixes()));
            Ok(())
        });

    peer.write_all(b":led:ok #1\n:led:err //busy\n\n:config\n").unwrap();

    assert!(client
        .run_until(|_| seen.borrow().len() == 3, within(5))
        .unwrap());
    assert_eq!(
        *seen.borrow(),
        vec!["exact :led:ok", "type :led:err", "any :config"]
    );
}

/// Test a malformed line does not end the session
#[test]
fn test_bad_line_is_per_line() {
    let (listener, config) = listener();
    let mut client = Client::connect(&config, Recorder::default()).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    peer.write_all(b":led #5-2\n:led $\n:hi:welcome\n").unwrap();

    assert!(client.run_until(|c| c.is_ready(), within(5)).unwrap());
    assert_eq!(client.lifecycle().errors, 2);
    assert!(client.session().is_connected());
}

/// Test lines split across TCP segments are reassembled
#[test]
fn test_line_split_across_writes() {
    let (listener, config) = listener();
    let mut client = Client::connect(&config, Recorder::default()).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    let got = Rc::new(RefCell::new(None));
    let sink = got.clone();
    client.on_type("led", move |_, msg| {
        *sink.borrow_mut() = Some(msg.clone());
        Ok(())
    });

    peer.write_all(b":led #0-2 r=2").unwrap();
    peer.flush().unwrap();
    client.run_until(|c| c.session().stats().bytes_read >= 13, within(5)).unwrap();
    assert!(got.borrow().is_none());

    peer.write_all(b"55 &blink\n").unwrap();
    assert!(client.run_until(|_| got.borrow().is_some(), within(5)).unwrap());

    let msg = got.borrow().clone().unwrap();
    assert_eq!(msg.to_wire(), ":led #0-2 r=255 &blink\n");
}

/// Test disconnect is reported once and ends all I/O
#[test]
fn test_disconnect_reported_once() {
    let (listener, config) = listener();
    let mut client = Client::connect(&config, Recorder::default()).unwrap();
    let (mut peer, _) = listener.accept().unwrap();

    peer.write_all(b":hi:welcome\n").unwrap();
    drop(peer);

    client.run().unwrap();
    assert!(client.is_ready());
    assert!(client.session().is_closed());
    assert_eq!(client.lifecycle().disconnects, 1);

    let read = client.session().stats().bytes_read;
    for _ in 0..3 {
        assert!(matches!(
            client.loop_once(),
            Err(LedError::Disconnected { .. })
        ));
    }
    let msg = Message::new("led").unwrap();
    assert!(matches!(
        client.send(&msg),
        Err(LedError::Disconnected { .. })
    ));
    assert_eq!(client.session().stats().bytes_read, read);
    assert_eq!(client.lifecycle().disconnects, 1);
}

/// Test a large burst arrives complete and in order
#[test]
fn test_outbound_order_under_backpressure() {
    const COUNT: u32 = 50_000;

    let (listener, config) = listener();
    let reader = thread::spawn(move || {
        let (peer, _): (TcpStream, _) = listener.accept().unwrap();
        let mut lines = Vec::with_capacity(COUNT as usize);
        for line in BufReader::new(peer).lines() {
            lines.push(line.unwrap());
            if lines.len() == COUNT as usize {
                break;
            }
        }
        lines
    });

    let mut client = Client::connect(&config, Recorder::default()).unwrap();
    for i in 0..COUNT {
        let msg = Message::new("led")
            .unwrap()
            .with_objects([i])
            .with_value("r", u64::from(i % 256));
        client.send(&msg).unwrap();
    }
    client.flush().unwrap();
    assert_eq!(client.connection().unsent(), 0);
    assert_eq!(client.session().stats().messages_sent, u64::from(COUNT));

    let lines = reader.join().unwrap();
    assert_eq!(lines.len(), COUNT as usize);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(*line, format!(":led #{i} r={}", i % 256));
    }
}

/// Test handlers can answer through the connection
#[test]
fn test_handler_replies() {
    let (listener, config) = listener();
    let mut client = Client::connect(&config, Recorder::default()).unwrap();
    let (peer, _) = listener.accept().unwrap();
    let mut writer = peer.try_clone().unwrap();
    let mut reader = BufReader::new(peer);

    client.on("hi", "welcome", |conn, _| {
        conn.send(&Message::new("led")?.with_objects(0..4).with_flag("&blink"))
    });

    writer.write_all(b":hi:welcome\n").unwrap();
    client.run_until(|c| c.is_ready(), within(5)).unwrap();
    client.flush().unwrap();

    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    assert_eq!(line, ":led #0-3 &blink\n");
}

/// Test connecting to a closed port reports failure
#[test]
fn test_connect_refused() {
    let (listener, config) = listener();
    drop(listener);

    let mut client = match Client::connect(&config, Recorder::default()) {
        Ok(client) => client,
        Err(err) => {
            assert!(matches!(err, LedError::ConnectFailed { .. }));
            return;
        },
    };
    let result = client.run_until(|_| false, within(5));
    assert!(matches!(result, Err(LedError::Disconnected { .. })));
    assert_eq!(client.lifecycle().connects, 0);
    assert_eq!(client.lifecycle().disconnects, 0);
}
