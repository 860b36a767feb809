// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Producer/consumer demo for the bounded byte pipe.
//
// Usage:
//   demo_pipe [capacity] [total_bytes]
//
// A producer thread pushes `total_bytes` through a pipe of `capacity`
// bytes while the main thread drains it, so the backpressure (writer
// blocking on a full buffer) is visible in the throughput number.
// Defaults: capacity 1000, total 16 MiB.

use std::thread;
use std::time::Instant;

use libpipe::{pipe, ByteQueue};

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let capacity: u64 = args
        .get(1)
        .map(|s| s.parse().expect("capacity"))
        .unwrap_or(1000);
    let total: u64 = args
        .get(2)
        .map(|s| s.parse().expect("total_bytes"))
        .unwrap_or(16 * 1024 * 1024);

    println!("pipe capacity: {capacity} B, transferring {total} B");

    let (mut sink, mut source) = pipe(capacity);

    let producer = thread::spawn(move || {
        let chunk = vec![0xABu8; 8192];
        let mut sent = 0u64;
        while sent < total {
            let n = chunk.len().min((total - sent) as usize);
            let mut queue = ByteQueue::from(&chunk[..n]);
            sink.write(&mut queue, n as u64).expect("write");
            sent += n as u64;
        }
        sink.close().expect("close sink");
    });

    let start = Instant::now();
    let mut received = 0u64;
    let mut queue = ByteQueue::new();
    while let Some(n) = source.read(&mut queue, u64::MAX).expect("read") {
        received += n;
        queue.clear();
    }
    let elapsed = start.elapsed();

    producer.join().unwrap();
    source.close().expect("close source");

    assert_eq!(received, total);
    println!(
        "received {received} B in {:.1} ms ({:.1} MiB/s)",
        elapsed.as_secs_f64() * 1000.0,
        received as f64 / (1024.0 * 1024.0) / elapsed.as_secs_f64()
    );
}
