//! Write queue drain benchmarks.
//!
//! Measures queueing and flushing SEND frames through an in-memory socket:
//! - Frame counts: 100, 1000
//! - Pipe capacities: unbounded, 512 bytes (forces partial writes)
//!
//! Run with: cargo bench --bench write_queue
//! Results saved to: target/criterion/

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use onstomp_core::transport::Socket;
use onstomp_core::{Client, Connection, Frame, MemorySocket, StompSerializer};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const FRAME_COUNTS: &[usize] = &[100, 1000];
const BODY: &[u8] = &[b'x'; 256];
const BOUNDED_CAPACITY: usize = 512;

// ============================================================================
// Fixtures
// ============================================================================

struct Sink;

impl Client for Sink {
    fn versions(&self) -> Vec<String> {
        vec!["1.0".into()]
    }
}

fn frame(n: usize) -> Frame {
    Frame::new("SEND")
        .with_header("destination", "/queue/bench")
        .with_header("seq", n.to_string())
        .with_body(BODY)
}

fn drain_peer(peer: &mut MemorySocket, buf: &mut [u8]) {
    while peer.read_nonblock(buf).is_ok_and(|n| n > 0) {}
}

// ============================================================================
// Benchmark: Flush
// ============================================================================

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");

    for &count in FRAME_COUNTS {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("unbounded", count), &count, |b, &count| {
            b.iter(|| {
                let (socket, mut peer) = MemorySocket::pair();
                let mut connection =
                    Connection::new(socket, Arc::new(Sink), Box::new(StompSerializer::new()));
                for n in 0..count {
                    connection.write_frame_nonblock(frame(n)).expect("queue frame");
                }
                connection.flush_write_buffer().expect("flush");
                let mut buf = vec![0u8; 64 * 1024];
                drain_peer(&mut peer, &mut buf);
            });
        });

        group.bench_with_input(BenchmarkId::new("bounded", count), &count, |b, &count| {
            b.iter(|| {
                let (socket, mut peer) = MemorySocket::pair_with_capacity(BOUNDED_CAPACITY);
                let mut connection =
                    Connection::new(socket, Arc::new(Sink), Box::new(StompSerializer::new()));
                for n in 0..count {
                    connection.write_frame_nonblock(frame(n)).expect("queue frame");
                }

                let mut buf = vec![0u8; BOUNDED_CAPACITY];
                while connection.pending_writes() > 0 {
                    connection.process_write().expect("write tick");
                    drain_peer(&mut peer, &mut buf);
                }
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Queue
// ============================================================================

fn bench_queue(c: &mut Criterion) {
    c.bench_function("queue_1000_frames", |b| {
        b.iter(|| {
            let (socket, _peer) = MemorySocket::pair();
            let mut connection =
                Connection::new(socket, Arc::new(Sink), Box::new(StompSerializer::new()));
            for n in 0..1000 {
                connection.write_frame_nonblock(frame(n)).expect("queue frame");
            }
            connection.pending_bytes()
        });
    });
}

criterion_group!(benches, bench_flush, bench_queue);
criterion_main!(benches);
