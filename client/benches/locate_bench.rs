// Address derivation and transaction benchmarks for the time-vault client.
//
// Covers vault address lookup (the bump search hashes and decompresses up to
// 256 candidates), message compilation, and signing an unlock transaction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use timevault_client::config::{program_id, VAULT_SEED};
use timevault_client::crypto::keys::{Hash, Keypair};
use timevault_client::crypto::pda::create_program_address;
use timevault_client::locator::VaultLocator;
use timevault_client::program::instruction;
use timevault_client::transaction::{Message, Transaction};

fn bench_locate(c: &mut Criterion) {
    let locator = VaultLocator::default();
    let owner = Keypair::from_seed(&[42; 32]).pubkey();

    c.bench_function("locator/locate", |b| {
        b.iter(|| locator.locate(black_box(&owner)).unwrap());
    });
}

fn bench_locate_many(c: &mut Criterion) {
    let locator = VaultLocator::default();
    let mut group = c.benchmark_group("locator/locate_many");

    for size in [10, 100] {
        let owners: Vec<_> = (0..size)
            .map(|i| Keypair::from_seed(&[i as u8; 32]).pubkey())
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &owners, |b, owners| {
            b.iter(|| {
                for owner in owners {
                    locator.locate(owner).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_create_with_known_bump(c: &mut Criterion) {
    let locator = VaultLocator::default();
    let owner = Keypair::from_seed(&[42; 32]).pubkey();
    let bump = locator.locate(&owner).unwrap().bump;
    let program = program_id();

    c.bench_function("pda/create_program_address", |b| {
        b.iter(|| create_program_address(&[VAULT_SEED, owner.as_ref(), &[bump]], &program).unwrap());
    });
}

fn bench_sign_unlock(c: &mut Criterion) {
    let keypair = Keypair::generate();
    let owner = keypair.pubkey();
    let vault = VaultLocator::default().locate(&owner).unwrap().address;
    let ix = instruction::unlock(&program_id(), &owner, &vault).unwrap();
    let blockhash = Hash::new_from_array([7; 32]);

    c.bench_function("transaction/compile_and_sign_unlock", |b| {
        b.iter(|| {
            let message = Message::new(std::slice::from_ref(&ix), &owner, blockhash).unwrap();
            let mut tx = Transaction::new_unsigned(message);
            tx.signatures[0] = keypair.sign_message(&tx.message.serialize().unwrap());
            tx
        });
    });
}

criterion_group!(
    benches,
    bench_locate,
    bench_locate_many,
    bench_create_with_known_bump,
    bench_sign_unlock,
);
criterion_main!(benches);
