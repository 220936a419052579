//! Ledger behaviour switches.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use finledger_core::{DomainError, ErrorCode};

/// Environment variable selecting [`RepeatReversal`].
pub const REPEAT_REVERSAL_ENV: &str = "FINLEDGER_REPEAT_REVERSAL";

/// What marking an already-reversed payment record does.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatReversal {
    /// Fail with `ALREADY_REVERSED`; the first reversal stays on record.
    #[default]
    Reject,
    /// Replace reason and timestamp (admin correction flow).
    Overwrite,
}

impl FromStr for RepeatReversal {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(RepeatReversal::Reject),
            "overwrite" => Ok(RepeatReversal::Overwrite),
            other => Err(DomainError::validation(
                ErrorCode::InvalidPolicy,
                format!("unknown repeat-reversal policy: {other}"),
            )),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerPolicy {
    pub repeat_reversal: RepeatReversal,
}

impl LedgerPolicy {
    /// Read the policy from the process environment, falling back to defaults.
    ///
    /// Call once at startup and pass `repeat_reversal` to
    /// [`crate::PaymentRecord::mark_reversed`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let repeat_reversal = match lookup(REPEAT_REVERSAL_ENV) {
            None => RepeatReversal::default(),
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!(error = %err, "{REPEAT_REVERSAL_ENV} invalid; using default");
                RepeatReversal::default()
            }),
        };

        tracing::debug!(?repeat_reversal, "ledger policy loaded");
        Self { repeat_reversal }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_reject() {
        let policy = LedgerPolicy::from_lookup(|_| None);
        assert_eq!(policy.repeat_reversal, RepeatReversal::Reject);
    }

    #[test]
    fn reads_overwrite_case_insensitively() {
        let policy = LedgerPolicy::from_lookup(|_| Some(" Overwrite ".to_string()));
        assert_eq!(policy.repeat_reversal, RepeatReversal::Overwrite);
    }

    #[test]
    fn unknown_value_falls_back_to_default() {
        let policy = LedgerPolicy::from_lookup(|_| Some("sometimes".to_string()));
        assert_eq!(policy, LedgerPolicy::default());
    }

    #[test]
    fn unknown_value_is_an_invalid_policy() {
        let err = "sometimes".parse::<RepeatReversal>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidPolicy);
        assert!(err.to_string().contains("sometimes"));
    }

    #[test]
    fn from_env_without_the_variable_is_default() {
        if std::env::var_os(REPEAT_REVERSAL_ENV).is_none() {
            assert_eq!(LedgerPolicy::from_env(), LedgerPolicy::default());
        }
    }

    #[test]
    fn deserializes_from_partial_json() {
        let policy: LedgerPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(policy.repeat_reversal, RepeatReversal::Reject);

        let policy: LedgerPolicy =
            serde_json::from_str(r#"{"repeat_reversal":"overwrite"}"#).unwrap();
        assert_eq!(policy.repeat_reversal, RepeatReversal::Overwrite);
    }
}
