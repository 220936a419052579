use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use finledger_core::{AggregateRoot, DomainError, ErrorCode, ExpectedVersion, Money, TenantId, UserId};
use finledger_events::{Event, TenantAggregate, TenantScoped};
use finledger_finance::{
    AccountPayable, AccountReceivable, CreateDebitMemo, CreatePayable, CreatePaymentVoucher,
    CreateReceiptVoucher, CreateReceivable, DebitMemo, DebitMemoEvent, LedgerPolicy, PartyId,
    PayableEvent, PayableId, PayableSourceType, PaymentMethod, PaymentRecordStatus,
    PaymentVoucher, ReceiptVoucher, ReceiptVoucherId, ReceivableEvent, ReceivablePaymentRecord,
    ReceivableSourceType, ReceivableStatus, RepeatReversal, SourceDocumentId,
    decode_payment_records, encode_payment_records,
};

fn test_time() -> DateTime<Utc> {
    Utc::now()
}

fn new_receivable(tenant_id: TenantId, total: Decimal) -> (AccountReceivable, ReceivableEvent) {
    finledger_observability::init();

    AccountReceivable::create(CreateReceivable {
        tenant_id,
        receivable_number: "AR-2024-0100".to_string(),
        customer_id: PartyId::generate(),
        customer_name: "Acme Trading".to_string(),
        source_type: ReceivableSourceType::SalesOrder,
        source_id: SourceDocumentId::generate(),
        source_number: "SO-2024-0100".to_string(),
        total_amount: Money::cny(total),
        due_date: None,
        occurred_at: test_time(),
    })
    .unwrap()
}

fn receive(ar: &mut AccountReceivable, amount: Decimal) -> ReceivableEvent {
    ar.apply_payment(Money::cny(amount), ReceiptVoucherId::generate(), "", test_time())
        .unwrap()
}

#[test]
fn receivable_settled_in_three_receipts() {
    let tenant_id = TenantId::new();
    let (mut ar, created) = new_receivable(tenant_id, dec!(1000));

    let mut envelopes = vec![ar.envelope(created)];
    for (amount, outstanding) in [(dec!(300), dec!(700)), (dec!(400), dec!(300)), (dec!(300), dec!(0))] {
        let event = receive(&mut ar, amount);
        assert_eq!(ar.outstanding_amount().amount(), outstanding);
        envelopes.push(ar.envelope(event));
    }

    assert_eq!(ar.status(), ReceivableStatus::Paid);
    assert_eq!(ar.payment_count(), 3);
    assert!(ar
        .payment_records()
        .iter()
        .all(|r| r.status() == PaymentRecordStatus::Active));

    let types: Vec<_> = envelopes.iter().map(|e| e.event_type().to_string()).collect();
    assert_eq!(
        types,
        [
            "finance.receivable.created",
            "finance.receivable.partially_paid",
            "finance.receivable.partially_paid",
            "finance.receivable.paid",
        ]
    );
    let sequence: Vec<_> = envelopes.iter().map(|e| e.sequence_number()).collect();
    assert_eq!(sequence, [1, 2, 3, 4]);
    assert!(envelopes.iter().all(|e| e.tenant_id() == tenant_id));
}

#[test]
fn disputed_receivable_is_reversed_with_refund() {
    let (mut ar, _) = new_receivable(TenantId::new(), dec!(1000));
    receive(&mut ar, dec!(400));

    let expected = ExpectedVersion::of(&ar);
    let (result, event) = ar.reverse("dispute", test_time()).unwrap();

    assert_eq!(result.refund_amount.amount(), dec!(400));
    assert_eq!(result.outstanding_waived.amount(), dec!(600));
    assert_eq!(result.compensation_record_ids.len(), 1);
    assert_eq!(ar.outstanding_amount().amount(), Decimal::ZERO);
    assert_eq!(ar.paid_amount().amount(), dec!(400));

    // A writer holding the pre-reversal version must be rejected.
    let err = expected.check(ar.version()).unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    let envelope = ar.envelope(event);
    assert_eq!(envelope.event_type(), "finance.receivable.reversed");
    match envelope.payload() {
        ReceivableEvent::Reversed(e) => {
            assert_eq!(e.previous_status, ReceivableStatus::Partial);
            assert_eq!(e.reversed_payments[0].compensation_record_id, result.compensation_record_ids[0]);
        }
        other => panic!("Expected Reversed event, got {other:?}"),
    }

    let err = ar.reverse("dispute", test_time()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[test]
fn reversed_records_survive_the_column_round_trip() {
    let (mut ar, _) = new_receivable(TenantId::new(), dec!(500));
    receive(&mut ar, dec!(100));
    receive(&mut ar, dec!(150));
    ar.reverse("order withdrawn", test_time()).unwrap();

    let bytes = encode_payment_records(ar.payment_records()).unwrap();
    let mut records: Vec<ReceivablePaymentRecord> = decode_payment_records(Some(bytes.as_slice())).unwrap();
    assert_eq!(records, ar.payment_records());

    let policy = LedgerPolicy::default();
    let err = records[0]
        .mark_reversed("again", test_time(), policy.repeat_reversal)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyReversed);

    records[0]
        .mark_reversed("corrected reason", test_time(), RepeatReversal::Overwrite)
        .unwrap();
    assert_eq!(records[0].reversal_reason(), Some("corrected reason"));
}

#[test]
fn voucher_allocation_then_payable_settlement() {
    finledger_observability::init();
    let tenant_id = TenantId::new();
    let supplier_id = PartyId::generate();

    let payable = |number: &str, total: Decimal| {
        AccountPayable::create(CreatePayable {
            tenant_id,
            payable_number: number.to_string(),
            supplier_id,
            supplier_name: "Northwind Supplies".to_string(),
            source_type: PayableSourceType::PurchaseOrder,
            source_id: SourceDocumentId::generate(),
            source_number: format!("PO-{number}"),
            total_amount: Money::cny(total),
            due_date: None,
            occurred_at: test_time(),
        })
        .unwrap()
        .0
    };
    let mut first = payable("AP-1", dec!(700));
    let mut second = payable("AP-2", dec!(500));

    let (mut voucher, _) = PaymentVoucher::create(CreatePaymentVoucher {
        tenant_id,
        voucher_number: "PV-1".to_string(),
        supplier_id,
        supplier_name: "Northwind Supplies".to_string(),
        amount: Money::cny(dec!(1000)),
        payment_method: PaymentMethod::BankTransfer,
        payment_date: test_time(),
        occurred_at: test_time(),
    })
    .unwrap();
    voucher.confirm(UserId::new(), test_time()).unwrap();

    // The caller applies each allocation to its payable.
    for (ap, amount) in [(&mut first, dec!(700)), (&mut second, dec!(300))] {
        let (allocation, _) = voucher
            .allocate_to_payable(ap.id_typed(), ap.payable_number(), Money::cny(amount), "", test_time())
            .unwrap();
        let event = ap
            .apply_payment(Money::cny(allocation.amount()), voucher.id_typed(), "", test_time())
            .unwrap();
        assert!(event.event_type().starts_with("finance.payable."));
    }

    assert!(voucher.is_allocated());
    assert!(first.is_paid());
    assert!(second.is_partial());
    assert_eq!(second.outstanding_amount().amount(), dec!(200));

    let (result, event) = second.reverse("supplier dispute", test_time()).unwrap();
    assert_eq!(result.refund_amount.amount(), dec!(300));
    assert!(matches!(event, PayableEvent::Reversed(_)));
    assert_eq!(second.payment_records()[0].voucher_id(), &voucher.id_typed());
    assert_eq!(TenantScoped::tenant_id(&second), tenant_id);
}

#[test]
fn receipt_voucher_settles_two_receivables() {
    let tenant_id = TenantId::new();
    let (mut first, _) = new_receivable(tenant_id, dec!(600));
    let (mut second, _) = new_receivable(tenant_id, dec!(400));

    let (mut receipt, created) = ReceiptVoucher::create(CreateReceiptVoucher {
        tenant_id,
        voucher_number: "RV-1".to_string(),
        customer_id: first.customer_id(),
        customer_name: "Acme Trading".to_string(),
        amount: Money::cny(dec!(800)),
        payment_method: PaymentMethod::BankTransfer,
        receipt_date: test_time(),
        occurred_at: test_time(),
    })
    .unwrap();
    assert_eq!(receipt.envelope(created).aggregate_type(), "finance.receipt_voucher");
    receipt.confirm(UserId::new(), test_time()).unwrap();

    for (ar, amount) in [(&mut first, dec!(600)), (&mut second, dec!(200))] {
        let (allocation, _) = receipt
            .allocate_to_receivable(ar.id_typed(), ar.receivable_number(), Money::cny(amount), "", test_time())
            .unwrap();
        ar.apply_payment(Money::cny(allocation.amount()), receipt.id_typed(), "", test_time())
            .unwrap();
    }

    assert!(receipt.is_allocated());
    assert!(first.is_paid());
    assert!(second.is_partial());
    assert_eq!(second.payment_records()[0].voucher_id(), &receipt.id_typed());

    let err = receipt.cancel(UserId::new(), "typo", test_time()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidState);
}

#[test]
fn debit_memo_events_follow_the_memo_version() {
    finledger_observability::init();
    let (mut memo, created) = DebitMemo::create(CreateDebitMemo {
        tenant_id: TenantId::new(),
        memo_number: "DM-1".to_string(),
        purchase_return_id: SourceDocumentId::generate(),
        purchase_return_number: "PR-1".to_string(),
        purchase_order_id: SourceDocumentId::generate(),
        purchase_order_number: "PO-1".to_string(),
        supplier_id: PartyId::generate(),
        supplier_name: "Northwind Supplies".to_string(),
        total_debit: Money::cny(dec!(250)),
        reason: "short shipment".to_string(),
        occurred_at: test_time(),
    })
    .unwrap();

    let mut envelopes = vec![memo.envelope(created)];
    let applied = memo
        .apply_to_payable(PayableId::generate(), Money::cny(dec!(100)), "", test_time())
        .unwrap();
    envelopes.push(memo.envelope(applied));
    let refunded = memo.receive_refund("BANK_TRANSFER", test_time()).unwrap();
    assert!(matches!(refunded, DebitMemoEvent::RefundReceived(_)));
    envelopes.push(memo.envelope(refunded));

    let sequence: Vec<_> = envelopes.iter().map(|e| e.sequence_number()).collect();
    assert_eq!(sequence, [1, 2, 3]);
    assert_eq!(envelopes[2].event_type(), "finance.debit_memo.refund_received");
    assert!(memo.is_refunded());
}
