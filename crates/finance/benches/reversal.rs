use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use chrono::Utc;
use finledger_core::{Money, TenantId};
use finledger_finance::{
    AccountReceivable, CreateReceivable, PartyId, ReceiptVoucherId, ReceivableSourceType,
    SourceDocumentId, decode_payment_records, encode_payment_records, ReceivablePaymentRecord,
};
use rust_decimal::Decimal;

/// Receivable of `payments * 10` with `payments` receipts of 1 applied.
fn receivable_with_payments(payments: usize) -> AccountReceivable {
    let (mut ar, _) = AccountReceivable::create(CreateReceivable {
        tenant_id: TenantId::new(),
        receivable_number: "AR-BENCH".to_string(),
        customer_id: PartyId::generate(),
        customer_name: "Bench Customer".to_string(),
        source_type: ReceivableSourceType::Manual,
        source_id: SourceDocumentId::generate(),
        source_number: "MANUAL-1".to_string(),
        total_amount: Money::cny(Decimal::from(payments as u64 * 10)),
        due_date: None,
        occurred_at: Utc::now(),
    })
    .unwrap();

    for _ in 0..payments {
        ar.apply_payment(Money::cny(Decimal::ONE), ReceiptVoucherId::generate(), "", Utc::now())
            .unwrap();
    }
    ar
}

fn bench_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse");
    for payments in [1usize, 10, 100, 1_000] {
        group.throughput(Throughput::Elements(payments as u64));
        group.bench_with_input(BenchmarkId::from_parameter(payments), &payments, |b, &n| {
            b.iter_batched(
                || receivable_with_payments(n),
                |mut ar| black_box(ar.reverse("bench", Utc::now()).unwrap()),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_payment_column(c: &mut Criterion) {
    let ar = receivable_with_payments(1_000);
    let bytes = encode_payment_records(ar.payment_records()).unwrap();

    let mut group = c.benchmark_group("payment_records_column");
    group.throughput(Throughput::Elements(1_000));
    group.bench_function("encode", |b| {
        b.iter(|| encode_payment_records(black_box(ar.payment_records())).unwrap())
    });
    group.bench_function("decode", |b| {
        b.iter(|| {
            let records: Vec<ReceivablePaymentRecord> =
                decode_payment_records(Some(black_box(bytes.as_slice()))).unwrap();
            records
        })
    });
    group.finish();
}

criterion_group!(benches, bench_reverse, bench_payment_column);
criterion_main!(benches);
