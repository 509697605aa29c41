//! # Stock Commands
//!
//! Branch-level stock queries and adjustments. Commands that name no
//! branch act on the home branch.

use apotheca_core::{BranchId, CoreError, InventoryLine, InventoryValuation, ProductId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::Outcome;
use crate::error::ApiError;
use crate::state::{CounterConfig, DbState};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryResponse {
    pub branch_id: BranchId,
    pub lines: Vec<InventoryLine>,
    pub valuation: InventoryValuation,
    pub formatted_value: String,
}

/// One SKU when `product_id` is given, otherwise the whole branch inventory.
pub async fn stock(
    db: &DbState,
    config: &CounterConfig,
    branch_id: Option<BranchId>,
    product_id: Option<ProductId>,
) -> Result<Outcome, ApiError> {
    let branch_id = branch_id.unwrap_or(config.home_branch);
    debug!(branch_id, ?product_id, "stock command");

    let ledger = db.inner().stock();

    if let Some(product_id) = product_id {
        let record = ledger
            .find(branch_id, product_id)
            .await?
            .ok_or(CoreError::NotCarried {
                branch_id,
                product_id,
            })?;
        return Outcome::ok()
            .with_message(format!("{} in stock", record.quantity_in_stock))
            .with_data(&record);
    }

    let lines = ledger.branch_inventory(branch_id).await?;
    let valuation = ledger.inventory_value(branch_id).await?;

    Outcome {
        total_amount: Some(valuation.value),
        ..Outcome::ok()
    }
    .with_data(&InventoryResponse {
        branch_id,
        lines,
        formatted_value: config.format_currency(valuation.value),
        valuation,
    })
}

pub async fn restock(
    db: &DbState,
    config: &CounterConfig,
    branch_id: Option<BranchId>,
    product_id: ProductId,
    quantity: i64,
) -> Result<Outcome, ApiError> {
    let branch_id = branch_id.unwrap_or(config.home_branch);
    debug!(branch_id, product_id, quantity, "restock command");

    let record = db
        .inner()
        .stock()
        .restock(branch_id, product_id, quantity)
        .await?;
    info!(branch_id, product_id, quantity = record.quantity_in_stock, "Restocked");

    Outcome::ok()
        .with_message(format!("{} in stock", record.quantity_in_stock))
        .with_data(&record)
}

/// SKUs at or below `threshold`, or the configured threshold.
pub async fn low_stock(
    db: &DbState,
    config: &CounterConfig,
    branch_id: Option<BranchId>,
    threshold: Option<i64>,
) -> Result<Outcome, ApiError> {
    let branch_id = branch_id.unwrap_or(config.home_branch);
    let threshold = threshold.unwrap_or(config.low_stock_threshold);
    debug!(branch_id, threshold, "low_stock command");

    if threshold < 0 {
        return Err(ApiError::validation("threshold must not be negative"));
    }

    let lines = db.inner().stock().low_stock(branch_id, threshold).await?;

    Outcome::ok()
        .with_message(format!("{} SKUs at or below {}", lines.len(), threshold))
        .with_data(&lines)
}

pub async fn add_sku(
    db: &DbState,
    config: &CounterConfig,
    branch_id: Option<BranchId>,
    product_id: ProductId,
    quantity: i64,
) -> Result<Outcome, ApiError> {
    let branch_id = branch_id.unwrap_or(config.home_branch);
    debug!(branch_id, product_id, quantity, "add_sku command");

    let record = db
        .inner()
        .stock()
        .add_sku(branch_id, product_id, quantity)
        .await?;

    Outcome::ok()
        .with_message(format!("Now carrying product {}", product_id))
        .with_data(&record)
}

pub async fn search_stock(
    db: &DbState,
    config: &CounterConfig,
    branch_id: Option<BranchId>,
    term: &str,
) -> Result<Outcome, ApiError> {
    let branch_id = branch_id.unwrap_or(config.home_branch);
    debug!(branch_id, term, "search_stock command");

    let lines = db.inner().stock().search(branch_id, term).await?;

    Outcome::ok()
        .with_message(format!("{} SKUs match '{}'", lines.len(), term.trim()))
        .with_data(&lines)
}

pub async fn not_carried(
    db: &DbState,
    config: &CounterConfig,
    branch_id: Option<BranchId>,
) -> Result<Outcome, ApiError> {
    let branch_id = branch_id.unwrap_or(config.home_branch);
    debug!(branch_id, "not_carried command");

    let products = db.inner().stock().not_carried(branch_id).await?;
    Outcome::ok().with_data(&products)
}

pub async fn restock_history(
    db: &DbState,
    config: &CounterConfig,
    branch_id: Option<BranchId>,
    days: u32,
) -> Result<Outcome, ApiError> {
    let branch_id = branch_id.unwrap_or(config.home_branch);
    debug!(branch_id, days, "restock_history command");

    let lines = db.inner().stock().restocked_since(branch_id, days).await?;

    Outcome::ok()
        .with_message(format!("{} SKUs restocked in the last {} days", lines.len(), days))
        .with_data(&lines)
}

#[cfg(test)]
mod tests {
    use crate::commands::test_support::counter;
    use crate::error::ErrorCode;
    use apotheca_core::Money;
    use serde_json::json;

    #[tokio::test]
    async fn test_inventory_and_value() {
        let shop = counter().await;

        let outcome = shop.send(json!({"command": "stock"})).await;

        // 10 × 10 + 5 × 5
        assert_eq!(outcome.total_amount, Some(Money::from_minor(125)));
        let data = outcome.data.unwrap();
        assert_eq!(data["lines"].as_array().unwrap().len(), 2);
        assert_eq!(data["valuation"]["total_units"], json!(15));
    }

    #[tokio::test]
    async fn test_restock_and_low_stock() {
        let shop = counter().await;

        let low = shop.send(json!({"command": "low_stock", "threshold": 5})).await;
        assert_eq!(low.data.unwrap().as_array().unwrap().len(), 1);

        let restocked = shop
            .send(json!({"command": "restock", "product_id": shop.rx, "quantity": 20}))
            .await;
        assert_eq!(restocked.data.unwrap()["quantity_in_stock"], json!(25));

        let low = shop.send(json!({"command": "low_stock", "threshold": 5})).await;
        assert!(low.data.unwrap().as_array().unwrap().is_empty());

        let bad = shop
            .send(json!({"command": "restock", "product_id": shop.rx, "quantity": 0}))
            .await;
        assert_eq!(bad.code, Some(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn test_add_sku_twice_is_duplicate() {
        let shop = counter().await;

        let outcome = shop
            .send(json!({"command": "add_sku", "product_id": shop.otc, "quantity": 10}))
            .await;

        assert_eq!(outcome.code, Some(ErrorCode::DuplicateSku));
        let stock = shop.send(json!({"command": "stock", "product_id": shop.otc})).await;
        assert_eq!(stock.data.unwrap()["quantity_in_stock"], json!(10));
    }

    #[tokio::test]
    async fn test_stock_of_uncarried_product() {
        let shop = counter().await;
        let outcome = shop.send(json!({"command": "stock", "product_id": 404})).await;
        assert_eq!(outcome.code, Some(ErrorCode::NotCarried));
    }

    #[tokio::test]
    async fn test_search_and_catalog_gaps() {
        let shop = counter().await;

        let found = shop.send(json!({"command": "search_stock", "term": "amox"})).await;
        assert!(found.success);
        let lines = found.data.unwrap();
        assert_eq!(lines.as_array().unwrap().len(), 1);
        assert_eq!(lines[0]["product_id"], json!(shop.rx));

        let missing = shop.send(json!({"command": "not_carried"})).await;
        assert!(missing.data.unwrap().as_array().unwrap().is_empty());

        let history = shop.send(json!({"command": "restock_history"})).await;
        assert_eq!(history.data.unwrap().as_array().unwrap().len(), 2);
    }
}
