use thiserror::Error;

use crate::models::{DealCandidate, ValidatedDeal};

/// Why a candidate was rejected. Checks run in a fixed order and the first
/// failing rule wins, so re-validating the same candidate always reports the
/// same reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("Deal payload is null")]
    MissingPayload,

    #[error("dealUniqueId must not be empty")]
    MissingUniqueId,

    #[error("fromCurrencyIsoCode must be a 3-letter ISO code")]
    BadFromCurrency,

    #[error("toCurrencyIsoCode must be a 3-letter ISO code")]
    BadToCurrency,

    #[error("fromCurrencyIsoCode and toCurrencyIsoCode must be different")]
    SameCurrency,

    #[error("dealTimestamp must not be null")]
    MissingTimestamp,

    #[error("dealAmount must not be null")]
    MissingAmount,

    #[error("dealAmount must be strictly positive")]
    NonPositiveAmount,
}

fn is_valid_currency_code(code: &str) -> bool {
    let trimmed = code.trim();
    trimmed.chars().count() == 3 && trimmed.chars().all(|c| c.is_alphabetic())
}

/// Business validation for one candidate. Pure and deterministic; on success
/// the candidate's fields are returned as a fully-present `ValidatedDeal`.
pub fn validate(candidate: Option<&DealCandidate>) -> Result<ValidatedDeal, RejectionReason> {
    let candidate = candidate.ok_or(RejectionReason::MissingPayload)?;

    if candidate.deal_unique_id.trim().is_empty() {
        return Err(RejectionReason::MissingUniqueId);
    }
    if !is_valid_currency_code(&candidate.from_currency) {
        return Err(RejectionReason::BadFromCurrency);
    }
    if !is_valid_currency_code(&candidate.to_currency) {
        return Err(RejectionReason::BadToCurrency);
    }
    if candidate
        .from_currency
        .trim()
        .eq_ignore_ascii_case(candidate.to_currency.trim())
    {
        return Err(RejectionReason::SameCurrency);
    }
    let timestamp = candidate.timestamp.ok_or(RejectionReason::MissingTimestamp)?;
    let amount = candidate.amount.ok_or(RejectionReason::MissingAmount)?;
    if amount <= rust_decimal::Decimal::ZERO {
        return Err(RejectionReason::NonPositiveAmount);
    }

    Ok(ValidatedDeal {
        deal_unique_id: candidate.deal_unique_id.clone(),
        from_currency: candidate.from_currency.clone(),
        to_currency: candidate.to_currency.clone(),
        timestamp,
        amount,
    })
}
