use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

use ndn_bench::{interest_for, random_name, signed_data};
use ndn_core::{Data, Interest, Name, Packet};

fn benchmark_name_codec(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let name = random_name(&mut rng, 8, 16);
    let wire = name.wire_encode();
    let uri = name.to_uri();

    c.bench_function("name_wire_encode", |b| b.iter(|| black_box(&name).wire_encode()));

    c.bench_function("name_wire_decode", |b| {
        b.iter(|| Name::from_wire(black_box(wire.clone())))
    });

    c.bench_function("name_from_uri", |b| b.iter(|| Name::from_uri(black_box(&uri))));

    let names: Vec<Name> = (0..1000).map(|_| random_name(&mut rng, 4, 8)).collect();
    c.bench_function("name_sort_1000", |b| {
        b.iter(|| {
            let mut sorted = names.clone();
            sorted.sort();
            sorted
        })
    });
}

fn benchmark_packet_codec(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let interest = interest_for(random_name(&mut rng, 6, 12)).with_must_be_fresh(true);
    let interest_wire = interest.wire_encode();

    c.bench_function("interest_wire_encode", |b| {
        b.iter(|| {
            let fresh = black_box(&interest).clone().with_nonce(1);
            fresh.wire_encode()
        })
    });

    c.bench_function("interest_wire_decode", |b| {
        b.iter(|| Interest::from_wire(black_box(interest_wire.clone())))
    });

    let data_name = random_name(&mut rng, 6, 12);
    let data = signed_data(&mut rng, data_name, 1024);
    let data_wire = data.wire_encode().unwrap_or_default();

    c.bench_function("data_full_name", |b| {
        b.iter(|| {
            let copy = black_box(&data).clone().with_signature_value(vec![1u8; 32]);
            copy.full_name().map(|n| n.len())
        })
    });

    c.bench_function("data_wire_decode", |b| {
        b.iter(|| Data::from_wire(black_box(data_wire.clone())))
    });

    c.bench_function("packet_dispatch", |b| {
        b.iter(|| Packet::from_wire(black_box(data_wire.clone())).map(|p| p.is_data()))
    });
}

criterion_group!(benches, benchmark_name_codec, benchmark_packet_codec);
criterion_main!(benches);
