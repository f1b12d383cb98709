use criterion::{black_box, criterion_group, criterion_main, Criterion};
use easy_ed25519::{BytesPool, KeyPair};
use std::sync::Arc;

fn bench_pem(c: &mut Criterion) {
    let pool = Arc::new(BytesPool::default());
    let keypair = KeyPair::generate(Some(pool.clone())).unwrap();
    let (public_pem, private_pem) = keypair.to_pem_strings().unwrap();

    c.bench_function("to_pem_strings", |b| {
        b.iter(|| black_box(keypair.to_pem_strings().unwrap()))
    });

    c.bench_function("from_pem", |b| {
        b.iter(|| {
            black_box(KeyPair::from_pem(&public_pem, &private_pem, pool.clone()).unwrap())
        })
    });

    c.bench_function("sign", |b| b.iter(|| black_box(keypair.sign(b"benchmark message"))));
}

criterion_group!(benches, bench_pem);
criterion_main!(benches);
