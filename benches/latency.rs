//! Latency benchmarks for order hashing and signing.
//!
//! Run with: `cargo bench --bench latency`

use alloy_primitives::U256;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rfq_core::signing::typed_data::{hash_struct, Types, Value};
use rfq_core::signing::{sign_order, Eip712Domain, Eip712Message, MessageToSign, Wallet};

const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
const SETTLEMENT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

fn domain() -> Eip712Domain {
    Eip712Domain::rfq_settlement(1, SETTLEMENT.parse().unwrap())
}

fn order(wallet: &Wallet) -> MessageToSign {
    MessageToSign::new(
        U256::from(1u64),
        wallet.address(),
        USDC.parse().unwrap(),
        U256::from(1_000_000u64),
        U256::ZERO,
    )
}

/// Benchmark the pieces of the order digest.
fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("digest");
    let wallet = Wallet::from_private_key(TEST_KEY).unwrap();
    let message = order(&wallet);
    let domain = domain();

    group.bench_function("domain_separator", |b| {
        b.iter(|| black_box(domain.separator().unwrap()))
    });

    group.bench_function("struct_hash", |b| {
        b.iter(|| black_box(message.struct_hash().unwrap()))
    });

    group.bench_function("signing_hash", |b| {
        b.iter(|| black_box(message.signing_hash(black_box(&domain)).unwrap()))
    });

    group.finish();
}

/// Benchmark struct hashing of nested types by depth.
fn bench_nested_struct_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_struct_hash");

    for depth in [1usize, 4, 16] {
        let mut types = Types::new().with_struct("Leaf", &[("amount", "uint256"), ("memo", "string")]);
        let mut value = Value::record([("amount", Value::from(7u64)), ("memo", Value::from("leaf"))]);
        let mut name = "Leaf".to_string();

        for level in 0..depth {
            let parent = format!("Node{level}");
            types = types.with_struct(&parent, &[("child", name.as_str()), ("id", "uint256")]);
            value = Value::record([("child", value), ("id", Value::from(level as u64))]);
            name = parent;
        }

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(hash_struct(&name, &types, &value).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark full order signing (digest, sign, recover).
fn bench_sign_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("sign_order");
    let wallet = Wallet::from_private_key(TEST_KEY).unwrap();
    let message = order(&wallet);
    let domain = domain();

    group.bench_function("sign_order", |b| {
        b.iter(|| black_box(sign_order(&domain, black_box(&message), &wallet).unwrap()))
    });

    let digest = message.signing_hash(&domain).unwrap();
    let signature = wallet.sign(&digest).unwrap();

    group.bench_function("sign_digest", |b| {
        b.iter(|| black_box(wallet.sign(black_box(&digest)).unwrap()))
    });

    group.bench_function("recover_address", |b| {
        b.iter(|| black_box(signature.recover_address(black_box(&digest)).unwrap()))
    });

    group.finish();
}

criterion_group!(benches, bench_digest, bench_nested_struct_hash, bench_sign_order);

criterion_main!(benches);
