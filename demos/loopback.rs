//! Handshake and echo against an in-process broker.
//!
//! Demonstrates:
//! - Driving a connection over a `MemorySocket` pair
//! - CONNECT / CONNECTED version negotiation
//! - Lifecycle events and the reactor loop
//! - Graceful close
//!
//! Usage:
//!   cargo run --example loopback
//!   cargo run --example loopback -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, bail};
use onstomp_core::transport::Socket;
use onstomp_core::{
    Client, Connection, ConnectionConfig, Frame, MemorySocket, Serializer, StompSerializer,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const MESSAGES: usize = 3;
const DESTINATION: &str = "/queue/demo";

// ============================================================================
// Client
// ============================================================================

#[derive(Default)]
struct Demo {
    received: AtomicUsize,
}

impl Client for Demo {
    fn versions(&self) -> Vec<String> {
        vec!["1.0".into(), "1.1".into()]
    }

    fn connect_headers(&self) -> Vec<(String, String)> {
        vec![("host".into(), "loopback".into())]
    }

    fn on_frame_received(&self, frame: &Frame) -> onstomp_core::Result<()> {
        if frame.command == "MESSAGE" {
            self.received.fetch_add(1, Ordering::SeqCst);
            println!("<- {frame}: {}", String::from_utf8_lossy(&frame.body));
        }
        Ok(())
    }
}

// ============================================================================
// Broker
// ============================================================================

/// Answers CONNECT with 1.1 and echoes every SEND back as a MESSAGE.
fn run_broker(mut socket: MemorySocket) -> anyhow::Result<()> {
    let mut codec = StompSerializer::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = match socket.read_nonblock(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(1));
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        for frame in codec.decode(&buf[..n])? {
            let reply = match frame.command.as_str() {
                "CONNECT" => {
                    codec.set_version("1.1");
                    Frame::new("CONNECTED").with_header("version", "1.1")
                }
                "SEND" => Frame::new("MESSAGE")
                    .with_header("destination", frame.header("destination").unwrap_or(""))
                    .with_header("message-id", frame.header("seq").unwrap_or("0"))
                    .with_body(frame.body.clone()),
                "DISCONNECT" => return Ok(()),
                other => bail!("broker cannot handle {other}"),
            };

            let bytes = codec.encode(&reply)?;
            socket.write_nonblock(&bytes)?;
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> anyhow::Result<()> {
    let debug = std::env::args().any(|arg| arg == "--debug");
    let filter = if debug { "onstomp_core=trace" } else { "onstomp_core=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let (socket, broker_socket) = MemorySocket::pair();
    let broker = thread::spawn(move || run_broker(broker_socket));

    let client = Arc::new(Demo::default());
    let config = ConnectionConfig::new().with_connect_timeout_ms(2_000);
    let mut connection = Connection::with_config(
        socket,
        Arc::clone(&client) as Arc<dyn Client>,
        Box::new(StompSerializer::new()),
        config,
    )?;

    connection.on_established(|event| {
        println!("established: {:?}", event.version);
    });
    connection.on_died(|event| println!("died: {}", event.connection_id));

    let (version, connected) = connection.connect([("login", "guest")])?;
    println!("negotiated STOMP {version} ({connected})");

    for seq in 0..MESSAGES {
        connection.invoke(
            "send_frame",
            [("destination", DESTINATION.to_string()), ("seq", seq.to_string())],
            format!("hello #{seq}"),
        )?;
    }

    while client.received.load(Ordering::SeqCst) < MESSAGES {
        connection.process()?;
        if !connection.is_connected() {
            bail!("broker went away");
        }
        thread::sleep(Duration::from_millis(1));
    }

    connection.invoke("disconnect_frame", Vec::<(String, String)>::new(), "")?;
    connection.flush_write_buffer()?;
    connection.close(false)?;
    connection.process_write()?;
    println!("closed: {:?}", connection.state());

    broker
        .join()
        .map_err(|_| anyhow::anyhow!("broker thread panicked"))?
        .context("broker failed")?;
    Ok(())
}
