//! Form input validation
//!
//! Length bounds on the text fields and a minimum-amount floor. The address
//! check is a length placeholder, not checksum validation - the chain rejects
//! malformed addresses at call time.

use serde::{Deserialize, Serialize};

/// Text fields must be between these lengths, inclusive
const MIN_TEXT_LEN: usize = 2;
const MAX_TEXT_LEN: usize = 50;

/// Raw transfer request as submitted
#[derive(Debug, Clone, Deserialize)]
pub struct TransferForm {
    pub network_chain: String,
    pub destination_address: String,
    pub destination_amount: f64,
    pub destination_token: String,
    pub origin_token: String,
}

/// A single field-level validation failure
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Validate a transfer form. Any violation blocks submission; all failures
/// are reported together so the caller can surface them per field.
pub fn validate(form: &TransferForm, min_amount: f64) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    check_text(&mut errors, "network_chain", &form.network_chain);
    check_text(&mut errors, "destination_address", &form.destination_address);
    check_text(&mut errors, "destination_token", &form.destination_token);
    check_text(&mut errors, "origin_token", &form.origin_token);

    if !form.destination_amount.is_finite() || form.destination_amount <= min_amount {
        errors.push(FieldError {
            field: "destination_amount",
            message: format!("must be greater than {}", min_amount),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_text(errors: &mut Vec<FieldError>, field: &'static str, value: &str) {
    let len = value.chars().count();
    if len < MIN_TEXT_LEN || len > MAX_TEXT_LEN {
        errors.push(FieldError {
            field,
            message: format!(
                "must be between {} and {} characters",
                MIN_TEXT_LEN, MAX_TEXT_LEN
            ),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN_AMOUNT: f64 = 0.0001;

    fn valid_form() -> TransferForm {
        TransferForm {
            network_chain: "Arbitrum".to_string(),
            destination_address: "0x1111111111111111111111111111111111111111".to_string(),
            destination_amount: 100.0,
            destination_token: "USDC".to_string(),
            origin_token: "WETH".to_string(),
        }
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(validate(&valid_form(), MIN_AMOUNT).is_ok());
    }

    #[test]
    fn test_zero_amount_blocks_submission() {
        let mut form = valid_form();
        form.destination_amount = 0.0;

        let errors = validate(&form, MIN_AMOUNT).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "destination_amount");
    }

    #[test]
    fn test_amount_must_exceed_minimum_strictly() {
        let mut form = valid_form();
        form.destination_amount = MIN_AMOUNT;
        assert!(validate(&form, MIN_AMOUNT).is_err());

        form.destination_amount = MIN_AMOUNT * 2.0;
        assert!(validate(&form, MIN_AMOUNT).is_ok());
    }

    #[test]
    fn test_non_finite_amount_is_rejected() {
        let mut form = valid_form();
        form.destination_amount = f64::NAN;
        assert!(validate(&form, MIN_AMOUNT).is_err());
    }

    #[test]
    fn test_address_length_bounds() {
        let mut form = valid_form();
        form.destination_address = "x".to_string();
        let errors = validate(&form, MIN_AMOUNT).unwrap_err();
        assert_eq!(errors[0].field, "destination_address");

        form.destination_address = "y".repeat(51);
        assert!(validate(&form, MIN_AMOUNT).is_err());

        form.destination_address = "y".repeat(50);
        assert!(validate(&form, MIN_AMOUNT).is_ok());
    }

    #[test]
    fn test_all_failures_reported_together() {
        let form = TransferForm {
            network_chain: String::new(),
            destination_address: String::new(),
            destination_amount: 0.0,
            destination_token: String::new(),
            origin_token: String::new(),
        };

        let errors = validate(&form, MIN_AMOUNT).unwrap_err();
        assert_eq!(errors.len(), 5);
    }
}
