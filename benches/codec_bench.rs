use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pairsync::protocol::{encode_frame, FrameCodec, MessageType};

fn make_wire(frame_count: usize, payload_size: usize) -> Vec<u8> {
    let payload = vec![0xA5u8; payload_size];
    let mut wire = Vec::with_capacity(frame_count * (5 + payload_size));
    for _ in 0..frame_count {
        wire.extend_from_slice(&encode_frame(MessageType::FileChunk, &payload));
    }
    wire
}

fn bench_feed_whole_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_feed_whole");

    for payload_size in [256usize, 4 * 1024, 64 * 1024].iter() {
        let wire = make_wire(100, *payload_size);
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(payload_size),
            payload_size,
            |b, _| {
                b.iter(|| {
                    let mut codec = FrameCodec::new();
                    let frames = codec.feed(black_box(&wire)).unwrap();
                    assert_eq!(frames.len(), 100);
                });
            },
        );
    }
    group.finish();
}

fn bench_feed_fragmented(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_feed_fragmented");

    let wire = make_wire(100, 4 * 1024);
    for chunk_size in [64usize, 512, 1400].iter() {
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut codec = FrameCodec::new();
                    let mut total = 0;
                    for chunk in wire.chunks(chunk_size) {
                        total += codec.feed(black_box(chunk)).unwrap().len();
                    }
                    assert_eq!(total, 100);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_feed_whole_stream, bench_feed_fragmented);
criterion_main!(benches);
