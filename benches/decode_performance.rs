use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use postecho::console::render_body;
use postecho::{BodyFormat, Console, EchoListener, HttpCodec, ListenerConfig, PostClient};
use tokio::runtime::Runtime;
use tokio_util::codec::Decoder;

fn json_body(entries: usize) -> String {
    let fields: Vec<String> = (0..entries)
        .map(|i| format!("\"Voltage_{i}\":{}.{:06}", i % 4, i * 7))
        .collect();
    format!("{{\"nodeId\":\"node-1\",\"level\":\"info\",{}}}", fields.join(","))
}

fn bench_request_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decode");

    for size in [64usize, 1024, 16384, 262144] {
        let body = vec![b'x'; size];
        let mut request =
            format!("POST / HTTP/1.1\r\nHost: localhost\r\nContent-Length: {size}\r\n\r\n")
                .into_bytes();
        request.extend_from_slice(&body);

        group.throughput(Throughput::Bytes(request.len() as u64));
        group.bench_with_input(BenchmarkId::new("post", size), &request, |b, request| {
            b.iter(|| {
                let mut codec = HttpCodec::new(1024 * 1024, "bench");
                let mut buf = BytesMut::from(&request[..]);
                codec.decode(black_box(&mut buf)).unwrap().unwrap()
            });
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_body");

    for entries in [4usize, 64, 1024] {
        let body = json_body(entries);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::new("json", entries), &body, |b, body| {
            b.iter(|| render_body(black_box(body), BodyFormat::Json).len());
        });
        group.bench_with_input(BenchmarkId::new("raw", entries), &body, |b, body| {
            b.iter(|| render_body(black_box(body), BodyFormat::Raw).len());
        });
    }

    group.finish();
}

fn bench_post_roundtrip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let (addr, shutdown) = rt.block_on(async {
        let config = ListenerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ListenerConfig::default()
        };
        let listener = EchoListener::bind_with_console(config, Console::new(std::io::sink()))
            .await
            .unwrap();
        let addr = listener.local_addr();
        let shutdown = listener.shutdown_signal();
        tokio::spawn(listener.run());
        (addr, shutdown)
    });

    let body = json_body(16);
    c.bench_function("post_roundtrip", |b| {
        b.to_async(&rt).iter(|| async {
            let response = PostClient::new(addr)
                .post("/", black_box(body.as_bytes()))
                .await
                .unwrap();
            assert!(response.status.is_success());
        });
    });

    let _ = shutdown.send(());
}

criterion_group!(benches, bench_request_decode, bench_render, bench_post_roundtrip);
criterion_main!(benches);
