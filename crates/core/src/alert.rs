//! Alert codes and the outcome attached to every stored event.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Identifier of one triggered fraud rule.
///
/// Variants are declared in ascending code order so the derived `Ord` sorts by code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AlertCode {
    /// The two most recent prior events and this one are all withdrawals.
    ThreeConsecutiveWithdrawals,
    /// Deposits in the trailing 30 seconds plus this deposit exceed 200.00.
    DepositSumOver200In30s,
    /// Three strictly increasing deposits in a row.
    ThreeConsecutiveIncreasingDeposits,
    /// A single withdrawal above 100.00.
    WithdrawalOver100,
}

impl AlertCode {
    pub const ALL: [AlertCode; 4] = [
        AlertCode::ThreeConsecutiveWithdrawals,
        AlertCode::DepositSumOver200In30s,
        AlertCode::ThreeConsecutiveIncreasingDeposits,
        AlertCode::WithdrawalOver100,
    ];

    pub fn code(self) -> i32 {
        match self {
            AlertCode::ThreeConsecutiveWithdrawals => 30,
            AlertCode::DepositSumOver200In30s => 123,
            AlertCode::ThreeConsecutiveIncreasingDeposits => 300,
            AlertCode::WithdrawalOver100 => 1100,
        }
    }

    pub fn from_code(code: i32) -> DomainResult<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| DomainError::validation(format!("unknown alert code {code}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            AlertCode::ThreeConsecutiveWithdrawals => "THREE_CONSEC_WITHDRAWALS",
            AlertCode::DepositSumOver200In30s => "DEPOSIT_SUM_OVER_200_IN_30S",
            AlertCode::ThreeConsecutiveIncreasingDeposits => "THREE_CONSEC_INCREASING_DEPOSITS",
            AlertCode::WithdrawalOver100 => "WITHDRAWAL_OVER_100",
        }
    }
}

impl core::fmt::Display for AlertCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}({})", self.name(), self.code())
    }
}

impl Serialize for AlertCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for AlertCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i32::deserialize(deserializer)?;
        AlertCode::from_code(code).map_err(serde::de::Error::custom)
    }
}

/// Result of evaluating one event.
///
/// Invariant: `alerted` is true exactly when `codes` is non-empty. Every constructor
/// enforces it; [`AlertOutcome::ensure_consistent`] re-checks it before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAlertOutcome")]
pub struct AlertOutcome {
    alerted: bool,
    codes: BTreeSet<AlertCode>,
}

impl ValueObject for AlertOutcome {}

#[derive(Deserialize)]
struct RawAlertOutcome {
    alerted: bool,
    codes: BTreeSet<AlertCode>,
}

impl TryFrom<RawAlertOutcome> for AlertOutcome {
    type Error = DomainError;

    fn try_from(raw: RawAlertOutcome) -> Result<Self, Self::Error> {
        AlertOutcome::from_parts(raw.alerted, raw.codes)
    }
}

impl AlertOutcome {
    pub fn clear() -> Self {
        Self {
            alerted: false,
            codes: BTreeSet::new(),
        }
    }

    /// Build from the set of triggered codes; `alerted` follows from it.
    pub fn from_codes(codes: impl IntoIterator<Item = AlertCode>) -> Self {
        let codes: BTreeSet<AlertCode> = codes.into_iter().collect();
        Self {
            alerted: !codes.is_empty(),
            codes,
        }
    }

    /// Rebuild from separately stored columns, rejecting inconsistent pairs.
    pub fn from_parts(alerted: bool, codes: BTreeSet<AlertCode>) -> DomainResult<Self> {
        let outcome = Self { alerted, codes };
        outcome.ensure_consistent()?;
        Ok(outcome)
    }

    pub fn ensure_consistent(&self) -> DomainResult<()> {
        if self.alerted != !self.codes.is_empty() {
            return Err(DomainError::invariant(format!(
                "alerted={} with {} alert code(s)",
                self.alerted,
                self.codes.len()
            )));
        }
        Ok(())
    }

    pub fn alerted(&self) -> bool {
        self.alerted
    }

    pub fn codes(&self) -> &BTreeSet<AlertCode> {
        &self.codes
    }

    pub fn contains(&self, code: AlertCode) -> bool {
        self.codes.contains(&code)
    }

    /// Numeric codes in ascending order.
    pub fn code_values(&self) -> Vec<i32> {
        self.codes.iter().map(|c| c.code()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_numbers() {
        for code in AlertCode::ALL {
            assert_eq!(AlertCode::from_code(code.code()).unwrap(), code);
        }
        assert!(AlertCode::from_code(31).is_err());
    }

    #[test]
    fn codes_sort_by_number() {
        let outcome = AlertOutcome::from_codes([
            AlertCode::WithdrawalOver100,
            AlertCode::ThreeConsecutiveWithdrawals,
        ]);
        assert_eq!(outcome.code_values(), vec![30, 1100]);
    }

    #[test]
    fn alerted_follows_codes() {
        assert!(!AlertOutcome::from_codes([]).alerted());
        assert!(AlertOutcome::from_codes([AlertCode::DepositSumOver200In30s]).alerted());
        assert_eq!(AlertOutcome::from_codes([]), AlertOutcome::clear());
    }

    #[test]
    fn duplicate_codes_collapse() {
        let outcome = AlertOutcome::from_codes([
            AlertCode::WithdrawalOver100,
            AlertCode::WithdrawalOver100,
        ]);
        assert_eq!(outcome.codes().len(), 1);
    }

    #[test]
    fn from_parts_rejects_inconsistent_pairs() {
        let err = AlertOutcome::from_parts(true, BTreeSet::new()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));

        let codes: BTreeSet<_> = [AlertCode::WithdrawalOver100].into_iter().collect();
        assert!(AlertOutcome::from_parts(false, codes.clone()).is_err());
        assert!(AlertOutcome::from_parts(true, codes).is_ok());
    }

    #[test]
    fn deserialization_enforces_invariant() {
        let ok: AlertOutcome = serde_json::from_str(r#"{"alerted":true,"codes":[1100]}"#).unwrap();
        assert!(ok.contains(AlertCode::WithdrawalOver100));
        assert!(serde_json::from_str::<AlertOutcome>(r#"{"alerted":false,"codes":[30]}"#).is_err());
        assert!(serde_json::from_str::<AlertOutcome>(r#"{"alerted":true,"codes":[7]}"#).is_err());
    }
}
