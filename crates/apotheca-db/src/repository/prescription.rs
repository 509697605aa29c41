//! # Prescription Register
//!
//! Prescriptions presented for orders and their review by a pharmacist.
//!
//! ```text
//! create ──► Pending ──validate──► Validated
//!                │
//!                └────reject────► Rejected
//! ```
//!
//! Review is one-shot: a reviewed prescription cannot be reviewed again.

use apotheca_core::validation::validate_prescription_number;
use apotheca_core::{
    BranchId, CoreError, NewPrescription, OrderId, PharmacistId, Prescription, PrescriptionId,
    ValidationStatus,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::error::{DbError, DbResult};

const PRESCRIPTION_COLUMNS: &str = "prescription_id, order_id, pharmacist_id, \
                                    prescription_number, issue_date, validation_status, \
                                    validation_date, notes";

/// Repository for order prescriptions.
#[derive(Debug, Clone)]
pub struct PrescriptionRegister {
    pool: SqlitePool,
}

impl PrescriptionRegister {
    pub fn new(pool: SqlitePool) -> Self {
        PrescriptionRegister { pool }
    }

    /// Registers a prescription for an order, pending review.
    pub async fn create(&self, new: &NewPrescription) -> DbResult<Prescription> {
        validate_prescription_number(&new.prescription_number)?;
        let number = new.prescription_number.trim();

        let order_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE order_id = ?1)")
                .bind(new.order_id)
                .fetch_one(&self.pool)
                .await?;
        if !order_exists {
            return Err(CoreError::OrderNotFound(new.order_id).into());
        }

        let sql = format!(
            "INSERT INTO prescriptions (order_id, prescription_number, issue_date, \
             validation_status, notes) VALUES (?1, ?2, ?3, ?4, ?5) \
             RETURNING {PRESCRIPTION_COLUMNS}"
        );

        let inserted = sqlx::query_as::<_, Prescription>(&sql)
            .bind(new.order_id)
            .bind(number)
            .bind(new.issue_date)
            .bind(ValidationStatus::Pending)
            .bind(&new.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from);

        match inserted {
            Ok(prescription) => {
                info!(
                    prescription_id = prescription.prescription_id,
                    order_id = new.order_id,
                    "Prescription registered"
                );
                Ok(prescription)
            }
            Err(err) if err.is_unique_violation() => {
                warn!(number, "Prescription number already registered");
                Err(CoreError::DuplicatePrescription(number.to_string()).into())
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        prescription_id: PrescriptionId,
        pharmacist_id: PharmacistId,
    ) -> DbResult<Prescription> {
        self.review(prescription_id, pharmacist_id, ValidationStatus::Validated, None)
            .await
    }

    /// Rejects a pending prescription. `reason` replaces the notes when given.
    #[instrument(skip(self, reason))]
    pub async fn reject(
        &self,
        prescription_id: PrescriptionId,
        pharmacist_id: PharmacistId,
        reason: Option<String>,
    ) -> DbResult<Prescription> {
        self.review(prescription_id, pharmacist_id, ValidationStatus::Rejected, reason)
            .await
    }

    async fn review(
        &self,
        prescription_id: PrescriptionId,
        pharmacist_id: PharmacistId,
        outcome: ValidationStatus,
        notes: Option<String>,
    ) -> DbResult<Prescription> {
        let sql = format!(
            "UPDATE prescriptions \
             SET validation_status = ?1, pharmacist_id = ?2, validation_date = ?3, \
                 notes = COALESCE(?4, notes) \
             WHERE prescription_id = ?5 AND validation_status = 'Pending' \
             RETURNING {PRESCRIPTION_COLUMNS}"
        );

        let reviewed = sqlx::query_as::<_, Prescription>(&sql)
            .bind(outcome)
            .bind(pharmacist_id)
            .bind(Utc::now())
            .bind(notes)
            .bind(prescription_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(prescription) = reviewed {
            info!(prescription_id, pharmacist_id, status = ?outcome, "Prescription reviewed");
            return Ok(prescription);
        }

        let current = self
            .get(prescription_id)
            .await?
            .ok_or(CoreError::PrescriptionNotFound(prescription_id))?;

        Err(CoreError::PrescriptionAlreadyReviewed {
            prescription_id,
            status: current.validation_status,
        }
        .into())
    }

    pub async fn get(&self, prescription_id: PrescriptionId) -> DbResult<Option<Prescription>> {
        let sql = format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE prescription_id = ?1"
        );

        let prescription = sqlx::query_as::<_, Prescription>(&sql)
            .bind(prescription_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(prescription)
    }

    pub async fn for_order(&self, order_id: OrderId) -> DbResult<Vec<Prescription>> {
        let sql = format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions \
             WHERE order_id = ?1 ORDER BY prescription_id"
        );

        let prescriptions = sqlx::query_as::<_, Prescription>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(prescriptions)
    }

    /// Prescriptions awaiting review for orders placed at a branch, oldest first.
    pub async fn pending(&self, branch_id: BranchId) -> DbResult<Vec<Prescription>> {
        let prescriptions = sqlx::query_as::<_, Prescription>(
            r#"
            SELECT rx.prescription_id, rx.order_id, rx.pharmacist_id, rx.prescription_number,
                   rx.issue_date, rx.validation_status, rx.validation_date, rx.notes
            FROM prescriptions rx
            INNER JOIN orders o ON o.order_id = rx.order_id
            WHERE o.branch_id = ?1 AND rx.validation_status = 'Pending'
            ORDER BY rx.prescription_id
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(prescriptions)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
