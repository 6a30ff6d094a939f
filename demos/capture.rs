//! Capture demo - full pipeline against a local TCP observer.
//!
//! Spawns a toy observer (TCP listener that unframes and decodes records),
//! wires a tracer to it, and feeds two overlapping synthetic request
//! lifecycles through the engine. Run with:
//!
//! ```sh
//! cargo run --example capture
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use tracewire::codec::MsgPackEncoder;
use tracewire::protocol::FrameBuffer;
use tracewire::{LifecycleEvent, PeerIdentity, TcpTransport, Tracer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Toy observer: accept one connection, print every record it receives.
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let observer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept failed");
        let mut buffer = FrameBuffer::new();
        let mut read_buf = vec![0u8; 16 * 1024];
        let mut seen = 0usize;

        while seen < 6 {
            let n = match stream.read(&mut read_buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            for payload in buffer.push(&read_buf[..n]).expect("bad frame") {
                let record = MsgPackEncoder::decode(&payload).expect("bad record");
                seen += 1;
                println!(
                    "[observer] {} {} {} status={:?} body={} final={}",
                    record.record_id,
                    record.method,
                    record.target,
                    record.status_code,
                    record.response_body.as_ref().map_or(0, |b| b.len()),
                    record.is_final(),
                );
            }
        }
    });

    // The tracer side: engine + TCP transport to the observer.
    let tracer = Tracer::builder().body_cap(64 * 1024).build();
    let peer = PeerIdentity::new("demo-observer", "_wiretap._tcp", "local");
    let transport = TcpTransport::connect(addr, peer).await?;
    tracer.attach(Arc::new(transport));

    // Two overlapping requests to the same endpoint, distinct ids.
    for (id, status, body) in [("req-a", 200u16, &b"hello"[..]), ("req-b", 404, b"missing")] {
        tracer.record(LifecycleEvent::Start {
            request_id: Some(id.into()),
            target: "https://api.example.com/items".into(),
            method: "GET".into(),
            headers: HashMap::from([("accept".into(), "application/json".into())]),
            body_prefix: None,
        });
        tracer.record(LifecycleEvent::Response {
            request_id: Some(id.into()),
            target: "https://api.example.com/items".into(),
            status,
            headers: HashMap::new(),
        });
        tracer.record(LifecycleEvent::Data {
            request_id: Some(id.into()),
            target: "https://api.example.com/items".into(),
            bytes: body.to_vec(),
        });
    }
    for id in ["req-a", "req-b"] {
        tracer.record(LifecycleEvent::Finish {
            request_id: Some(id.into()),
            target: "https://api.example.com/items".into(),
        });
    }

    tokio::time::timeout(Duration::from_secs(5), observer).await??;

    let stats = tracer.stats();
    println!("[tracer] sent={} dropped={}", stats.sent, stats.dropped);
    Ok(())
}
