use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nxtp_common::{AiTag, Priority};
use nxtp_wire::{parse_frame, write_frame, NxtpHeader, FRAME_OVERHEAD};

fn bench_codec(c: &mut Criterion) {
    let payload = vec![0xA5u8; 256];
    let header = NxtpHeader::new(7, AiTag::Embedding, Priority::High, payload.len() as u16)
        .with_checksum(&payload);

    c.bench_function("header_encode", |b| {
        b.iter(|| black_box(header).encode());
    });

    let mut frame = header.encode().to_vec();
    frame.extend_from_slice(&payload);
    c.bench_function("header_decode", |b| {
        b.iter(|| NxtpHeader::decode(black_box(&frame)).unwrap());
    });

    let mut buf = vec![0u8; FRAME_OVERHEAD + payload.len()];
    c.bench_function("frame_write_parse", |b| {
        b.iter(|| {
            let n = write_frame(&mut buf, [10, 0, 0, 1], [10, 0, 0, 2], &header, &payload).unwrap();
            parse_frame(black_box(&buf[..n])).unwrap().header
        });
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
