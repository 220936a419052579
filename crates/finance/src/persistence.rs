//! JSON column adapter for payment records.
//!
//! Stored rows may hold SQL `NULL`, an empty string, JSON `null` or an array.
//! The first three all mean "no payments".

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::payment_record::PaymentRecord;

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error("failed to encode payment records: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("malformed payment records column: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode records as a JSON array; an empty list becomes `[]`, never `null`.
pub fn encode_payment_records<O, V>(records: &[PaymentRecord<O, V>]) -> Result<Vec<u8>, ColumnError>
where
    O: Serialize,
    V: Serialize,
{
    serde_json::to_vec(records).map_err(ColumnError::Encode)
}

pub fn decode_payment_records<O, V>(raw: Option<&[u8]>) -> Result<Vec<PaymentRecord<O, V>>, ColumnError>
where
    O: DeserializeOwned,
    V: DeserializeOwned,
{
    let Some(bytes) = raw else {
        return Ok(Vec::new());
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let records: Option<Vec<PaymentRecord<O, V>>> =
        serde_json::from_slice(bytes).map_err(|err| {
            tracing::warn!(error = %err, "malformed payment records column");
            ColumnError::Decode(err)
        })?;
    Ok(records.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use crate::config::RepeatReversal;
    use crate::ids::{PaymentVoucherId, PayableId, ReceiptVoucherId, ReceivableId};
    use crate::payment_record::{PayablePaymentRecord, ReceivablePaymentRecord};

    #[test]
    fn empty_list_encodes_as_array() {
        let records: Vec<ReceivablePaymentRecord> = Vec::new();
        assert_eq!(encode_payment_records(&records).unwrap(), b"[]");
    }

    #[test]
    fn absent_or_blank_column_decodes_to_empty() {
        for raw in [None, Some(&b""[..]), Some(&b"  "[..]), Some(&b"null"[..]), Some(&b"[]"[..])] {
            let records: Vec<ReceivablePaymentRecord> = decode_payment_records(raw).unwrap();
            assert!(records.is_empty(), "{raw:?}");
        }
    }

    #[test]
    fn malformed_column_is_an_error() {
        let result: Result<Vec<PayablePaymentRecord>, _> =
            decode_payment_records(Some(&b"{not json"[..]));
        assert!(matches!(result, Err(ColumnError::Decode(_))));

        let result: Result<Vec<PayablePaymentRecord>, _> =
            decode_payment_records(Some(&br#"{"id":"x"}"#[..]));
        assert!(matches!(result, Err(ColumnError::Decode(_))));
    }

    #[test]
    fn populated_column_keeps_reversal_metadata() {
        let mut reversed = PaymentRecord::new(
            ReceivableId::generate(),
            ReceiptVoucherId::generate(),
            dec!(40),
            "",
            Utc::now(),
        );
        reversed
            .mark_reversed("dispute", Utc::now(), RepeatReversal::Reject)
            .unwrap();
        let active = PaymentRecord::new(
            *reversed.owner_id(),
            ReceiptVoucherId::generate(),
            dec!(60),
            "balance",
            Utc::now(),
        );
        let records = vec![reversed, active];

        let bytes = encode_payment_records(&records).unwrap();
        let back: Vec<ReceivablePaymentRecord> = decode_payment_records(Some(bytes.as_slice())).unwrap();
        assert_eq!(back, records);
        assert!(back[0].is_reversed());
        assert_eq!(back[0].reversal_reason(), Some("dispute"));
    }

    #[test]
    fn payable_records_use_the_same_format() {
        let record: PayablePaymentRecord = PaymentRecord::new(
            PayableId::generate(),
            PaymentVoucherId::generate(),
            dec!(1.25),
            "",
            Utc::now(),
        );
        let bytes = encode_payment_records(std::slice::from_ref(&record)).unwrap();
        let back: Vec<PayablePaymentRecord> = decode_payment_records(Some(bytes.as_slice())).unwrap();
        assert_eq!(back, vec![record]);
    }
}
