//! # Product Catalog
//!
//! Products and their current list prices.
//!
//! ## Partial Updates
//! ```text
//! ProductPatch { unit_price: Some(1200), category: Some("Analgesic"), .. }
//!      │
//!      ▼
//! UPDATE products SET unit_price = ?, category = ? WHERE product_id = ?
//!                     └──── one SET clause per present field ────┘
//! ```
//!
//! Price edits only affect carts. Order items keep the price they were
//! checked out at.

use apotheca_core::validation::{validate_price, validate_product_name, validate_product_patch};
use apotheca_core::{CoreError, Money, NewProduct, Product, ProductId, ProductPatch};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::DbResult;

const PRODUCT_COLUMNS: &str = "product_id, name, description, category, manufacturer, \
                               unit_price, requires_prescription, created_at";

/// Repository for catalog products.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    pool: SqlitePool,
}

impl ProductCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        ProductCatalog { pool }
    }

    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        validate_product_name(&product.name)?;
        validate_price(product.unit_price)?;

        let sql = format!(
            "INSERT INTO products (name, description, category, manufacturer, unit_price, \
             requires_prescription, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             RETURNING {PRODUCT_COLUMNS}"
        );

        let created = sqlx::query_as::<_, Product>(&sql)
            .bind(product.name.trim())
            .bind(&product.description)
            .bind(&product.category)
            .bind(&product.manufacturer)
            .bind(product.unit_price)
            .bind(product.requires_prescription)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;

        info!(product_id = created.product_id, name = %created.name, "Product created");
        Ok(created)
    }

    pub async fn get(&self, product_id: ProductId) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = ?1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// All products ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name");

        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Current list price. Fails with `UnknownProduct` for a missing product.
    pub async fn get_unit_price(&self, product_id: ProductId) -> DbResult<Money> {
        let price: Option<Money> =
            sqlx::query_scalar("SELECT unit_price FROM products WHERE product_id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(price.ok_or(CoreError::UnknownProduct(product_id))?)
    }

    pub async fn exists(&self, product_id: ProductId) -> DbResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE product_id = ?1)")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Applies the fields present in `patch`. An empty patch changes nothing.
    pub async fn update(&self, product_id: ProductId, patch: &ProductPatch) -> DbResult<Product> {
        validate_product_patch(patch)?;

        if patch.is_empty() {
            return Ok(self
                .get(product_id)
                .await?
                .ok_or(CoreError::UnknownProduct(product_id))?);
        }

        let mut builder = build_patch_query(product_id, patch);
        debug!(product_id, sql = builder.sql(), "Patching product");

        let updated = builder
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(CoreError::UnknownProduct(product_id))?;

        info!(product_id, "Product updated");
        Ok(updated)
    }
}

/// Emits `SET` clauses only for the fields present in the patch.
fn build_patch_query(product_id: ProductId, patch: &ProductPatch) -> QueryBuilder<'_, Sqlite> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE products SET ");

    {
        let mut set = builder.separated(", ");
        if let Some(name) = &patch.name {
            set.push("name = ").push_bind_unseparated(name.trim());
        }
        if let Some(description) = &patch.description {
            set.push("description = ").push_bind_unseparated(description);
        }
        if let Some(category) = &patch.category {
            set.push("category = ").push_bind_unseparated(category);
        }
        if let Some(manufacturer) = &patch.manufacturer {
            set.push("manufacturer = ").push_bind_unseparated(manufacturer);
        }
        if let Some(price) = patch.unit_price {
            set.push("unit_price = ").push_bind_unseparated(price);
        }
        if let Some(rx) = patch.requires_prescription {
            set.push("requires_prescription = ").push_bind_unseparated(rx);
        }
    }

    builder
        .push(" WHERE product_id = ")
        .push_bind(product_id)
        .push(" RETURNING ")
        .push(PRODUCT_COLUMNS);

    builder
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{memory_db, product};

    #[test]
    fn test_patch_query_sets_only_present_fields() {
        let patch = ProductPatch {
            unit_price: Some(Money::from_minor(1200)),
            category: Some("Analgesic".into()),
            ..Default::default()
        };

        let builder = build_patch_query(7, &patch);
        let sql = builder.sql();

        assert!(sql.starts_with("UPDATE products SET category = ?, unit_price = ? WHERE"));
        assert!(!sql.contains("name ="));
        assert!(!sql.contains("manufacturer ="));
    }

    #[tokio::test]
    async fn test_insert_get_and_price() {
        let db = memory_db().await;
        let id = product(&db, "Paracetamol 500mg", 1000, false).await;

        let catalog = db.products();
        let found = catalog.get(id).await.unwrap().unwrap();
        assert_eq!(found.name, "Paracetamol 500mg");
        assert!(!found.requires_prescription);

        assert_eq!(catalog.get_unit_price(id).await.unwrap(), Money::from_minor(1000));
        assert!(catalog.exists(id).await.unwrap());
        assert!(!catalog.exists(404).await.unwrap());

        let err = catalog.get_unit_price(404).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::UnknownProduct(404)));
    }

    #[tokio::test]
    async fn test_insert_rejects_bad_input() {
        let db = memory_db().await;
        let bad = NewProduct {
            name: "  ".into(),
            description: None,
            category: None,
            manufacturer: None,
            unit_price: Money::from_minor(100),
            requires_prescription: false,
        };
        assert!(db.products().insert(&bad).await.is_err());

        let negative = NewProduct {
            name: "Saline".into(),
            unit_price: Money::from_minor(-1),
            ..bad
        };
        assert!(db.products().insert(&negative).await.is_err());
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let db = memory_db().await;
        let id = product(&db, "Paracetamol 500mg", 1000, false).await;

        let updated = db
            .products()
            .update(
                id,
                &ProductPatch {
                    unit_price: Some(Money::from_minor(1100)),
                    requires_prescription: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Paracetamol 500mg");
        assert_eq!(updated.unit_price, Money::from_minor(1100));
        assert!(updated.requires_prescription);

        let unchanged = db.products().update(id, &ProductPatch::default()).await.unwrap();
        assert_eq!(unchanged, updated);

        let err = db
            .products()
            .update(
                404,
                &ProductPatch {
                    name: Some("Ghost".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.rejection(), Some(&CoreError::UnknownProduct(404)));
    }
}
