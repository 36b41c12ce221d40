//! Scanning throughput: hint rejections dominate, so measure batches of unrelated announcements.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use privatepay_core::types::{EthAddress, PaymentAnnouncement};
use privatepay_scanner::Scanner;
use privatepay_stealth::StealthAddressEngine;

fn announcements(count: usize) -> Vec<PaymentAnnouncement> {
    let engine = StealthAddressEngine::default();
    let others = engine.generate_meta_address().unwrap();
    (0..count)
        .map(|_| {
            let d = engine
                .generate_stealth_address(
                    others.spend.public.as_bytes(),
                    others.viewing.public.as_bytes(),
                    0,
                )
                .unwrap();
            PaymentAnnouncement::builder()
                .recipient(EthAddress::from_array([1; 20]))
                .ephemeral_pub_key(d.ephemeral_public_key.as_bytes().to_vec())
                .stealth_address(d.stealth_address)
                .view_hint(d.view_hint)
                .amount(rand::random::<u64>() as u128)
                .build()
                .unwrap()
        })
        .collect()
}

fn bench_scan(c: &mut Criterion) {
    let keys = StealthAddressEngine::default().generate_meta_address().unwrap();
    let scanner = Scanner::new(keys.viewing.secret.clone(), keys.spend.public).unwrap();

    let mut g = c.benchmark_group("scan");
    for size in [100usize, 1_000] {
        let batch = announcements(size);
        g.throughput(Throughput::Elements(size as u64));
        g.bench_with_input(BenchmarkId::new("scan_one", size), &batch, |b, batch| {
            b.iter(|| {
                for ann in batch {
                    black_box(scanner.scan_one(ann));
                }
            });
        });
    }
    g.finish();
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
