use chrono::{Duration, NaiveDate};

use super::domain::{Estimate, EstimateId, EstimateStatus, Invoice, NewInvoice, PaymentStatus};

pub const DEFAULT_PAYMENT_TERMS_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvoiceError {
    #[error("estimate {id} is {status} and cannot be invoiced")]
    EstimateNotConvertible {
        id: EstimateId,
        status: &'static str,
    },
    #[error("discount must not be negative (found {0})")]
    NegativeDiscount(i64),
    #[error("discount of {discount} exceeds invoice amount of {amount} (minor units)")]
    DiscountExceedsAmount { discount: i64, amount: i64 },
}

/// `amount - discount`, refusing results below zero.
pub fn final_amount(amount: i64, discount: i64) -> Result<i64, InvoiceError> {
    if discount < 0 {
        return Err(InvoiceError::NegativeDiscount(discount));
    }
    if discount > amount {
        return Err(InvoiceError::DiscountExceedsAmount { discount, amount });
    }
    Ok(amount - discount)
}

/// Unpaid invoice for the estimate's snapshot total.
pub fn invoice_from_estimate(
    estimate: &Estimate,
    issue_date: NaiveDate,
    due_in_days: u32,
) -> Result<NewInvoice, InvoiceError> {
    match estimate.status {
        EstimateStatus::Pending | EstimateStatus::Approved => {}
        status @ (EstimateStatus::ConvertedToInvoice | EstimateStatus::Cancelled) => {
            return Err(InvoiceError::EstimateNotConvertible {
                id: estimate.id,
                status: status.label(),
            })
        }
    }

    Ok(NewInvoice {
        estimate_id: Some(estimate.id),
        booking_id: estimate.booking_id,
        client_id: estimate.client_id,
        amount: estimate.total_amount,
        discount_amount: 0,
        discount_reason: None,
        final_amount: final_amount(estimate.total_amount, 0)?,
        payment_status: PaymentStatus::Unpaid,
        issue_date,
        due_date: issue_date + Duration::days(i64::from(due_in_days)),
    })
}

impl Invoice {
    /// Replace the discount and recompute the final amount. The invoice is
    /// left untouched when the discount is rejected.
    pub fn apply_discount(
        &mut self,
        discount: i64,
        reason: Option<String>,
    ) -> Result<(), InvoiceError> {
        self.final_amount = final_amount(self.amount, discount)?;
        self.discount_amount = discount;
        self.discount_reason = reason.filter(|reason| !reason.trim().is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boarding::domain::{BookingId, ClientId, DogId, ServiceType, UnitType};

    fn estimate(status: EstimateStatus) -> Estimate {
        Estimate {
            id: EstimateId(3),
            booking_id: Some(BookingId(8)),
            client_id: ClientId(1),
            dog_ids: vec![DogId(12)],
            service_type: ServiceType::Boarding,
            check_in_date: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid"),
            check_out_date: NaiveDate::from_ymd_opt(2025, 1, 5),
            units: 4,
            unit_type: UnitType::Nights,
            unit_price: 4000,
            total_amount: 16000,
            status,
            notes: String::new(),
        }
    }

    #[test]
    fn converts_pending_estimate_with_payment_terms() {
        let issued = NaiveDate::from_ymd_opt(2025, 1, 5).expect("valid");
        let invoice =
            invoice_from_estimate(&estimate(EstimateStatus::Pending), issued, 14).expect("converts");

        assert_eq!(invoice.amount, 16000);
        assert_eq!(invoice.final_amount, 16000);
        assert_eq!(invoice.booking_id, Some(BookingId(8)));
        assert_eq!(invoice.payment_status, PaymentStatus::Unpaid);
        assert_eq!(
            invoice.due_date,
            NaiveDate::from_ymd_opt(2025, 1, 19).expect("valid")
        );
    }

    #[test]
    fn refuses_cancelled_or_converted_estimates() {
        let issued = NaiveDate::from_ymd_opt(2025, 1, 5).expect("valid");
        for status in [EstimateStatus::Cancelled, EstimateStatus::ConvertedToInvoice] {
            match invoice_from_estimate(&estimate(status), issued, 14) {
                Err(InvoiceError::EstimateNotConvertible { id, .. }) => {
                    assert_eq!(id, EstimateId(3))
                }
                other => panic!("expected conversion refusal, got {other:?}"),
            }
        }
    }

    #[test]
    fn discount_keeps_final_amount_consistent() {
        let issued = NaiveDate::from_ymd_opt(2025, 1, 5).expect("valid");
        let draft =
            invoice_from_estimate(&estimate(EstimateStatus::Approved), issued, 7).expect("converts");
        let mut invoice = draft.into_invoice(crate::boarding::domain::InvoiceId(1));

        invoice
            .apply_discount(2500, Some("Loyalty".to_string()))
            .expect("discount fits");
        assert_eq!(invoice.final_amount, invoice.amount - invoice.discount_amount);
        assert_eq!(invoice.final_amount, 13500);

        let err = invoice
            .apply_discount(20000, None)
            .expect_err("discount exceeds amount");
        assert!(matches!(err, InvoiceError::DiscountExceedsAmount { .. }));
        assert_eq!(invoice.final_amount, 13500);
        assert_eq!(invoice.discount_reason.as_deref(), Some("Loyalty"));

        assert!(matches!(
            invoice.apply_discount(-1, None),
            Err(InvoiceError::NegativeDiscount(-1))
        ));
    }
}
