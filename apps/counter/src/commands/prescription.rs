//! # Prescription Commands

use apotheca_core::{NewPrescription, OrderId, PharmacistId, Prescription, PrescriptionId};
use chrono::NaiveDate;
use tracing::debug;

use crate::commands::Outcome;
use crate::error::ApiError;
use crate::state::DbState;

fn prescription_outcome(prescription: &Prescription) -> Result<Outcome, ApiError> {
    Outcome {
        order_id: Some(prescription.order_id),
        ..Outcome::ok()
    }
    .with_message(format!("{:?}", prescription.validation_status))
    .with_data(prescription)
}

pub async fn register_prescription(
    db: &DbState,
    order_id: OrderId,
    prescription_number: String,
    issue_date: NaiveDate,
    notes: Option<String>,
) -> Result<Outcome, ApiError> {
    debug!(order_id, %prescription_number, "register_prescription command");

    let prescription = db
        .inner()
        .prescriptions()
        .create(&NewPrescription {
            order_id,
            prescription_number,
            issue_date,
            notes,
        })
        .await?;

    prescription_outcome(&prescription)
}

pub async fn validate_prescription(
    db: &DbState,
    prescription_id: PrescriptionId,
    pharmacist_id: PharmacistId,
) -> Result<Outcome, ApiError> {
    debug!(prescription_id, pharmacist_id, "validate_prescription command");

    let prescription = db
        .inner()
        .prescriptions()
        .validate(prescription_id, pharmacist_id)
        .await?;

    prescription_outcome(&prescription)
}

pub async fn reject_prescription(
    db: &DbState,
    prescription_id: PrescriptionId,
    pharmacist_id: PharmacistId,
    reason: Option<String>,
) -> Result<Outcome, ApiError> {
    debug!(prescription_id, pharmacist_id, "reject_prescription command");

    let prescription = db
        .inner()
        .prescriptions()
        .reject(prescription_id, pharmacist_id, reason)
        .await?;

    prescription_outcome(&prescription)
}
