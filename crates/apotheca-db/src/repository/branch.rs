//! Branch directory: the pharmacy locations that hold stock.

use apotheca_core::validation::validate_branch_name;
use apotheca_core::{Branch, BranchId, NewBranch};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Repository for branch locations.
#[derive(Debug, Clone)]
pub struct BranchDirectory {
    pool: SqlitePool,
}

impl BranchDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        BranchDirectory { pool }
    }

    pub async fn insert(&self, branch: &NewBranch) -> DbResult<Branch> {
        validate_branch_name(&branch.name)?;

        let created = sqlx::query_as::<_, Branch>(
            r#"
            INSERT INTO branches (name, address, phone)
            VALUES (?1, ?2, ?3)
            RETURNING branch_id, name, address, phone
            "#,
        )
        .bind(branch.name.trim())
        .bind(&branch.address)
        .bind(&branch.phone)
        .fetch_one(&self.pool)
        .await?;

        info!(branch_id = created.branch_id, name = %created.name, "Branch created");
        Ok(created)
    }

    pub async fn get(&self, branch_id: BranchId) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            "SELECT branch_id, name, address, phone FROM branches WHERE branch_id = ?1",
        )
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(
            "SELECT branch_id, name, address, phone FROM branches ORDER BY branch_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(branches)
    }

    pub async fn exists(&self, branch_id: BranchId) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM branches WHERE branch_id = ?1)")
                .bind(branch_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}
