//! # Counter Commands
//!
//! Every request the counter understands, and the result object it answers
//! with.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs           ◄─── You are here (Request, Outcome, dispatch)
//! ├── cart.rs          ◄─── add_to_cart, view_cart, remove_from_cart, clear_cart
//! ├── order.rs         ◄─── checkout, cancel_order, order_status
//! ├── payment.rs       ◄─── record_payment, refund, payment_methods
//! ├── stock.rs         ◄─── stock, restock, low_stock, add_sku, search
//! └── prescription.rs  ◄─── register/validate/reject_prescription
//! ```
//!
//! ## How Commands Work
//! ```text
//! {"command":"record_payment","order_id":9,"method_id":1}
//!         │
//!         │ serde: tag = "command"
//!         ▼
//! Request::RecordPayment { order_id: 9, method_id: 1, .. }
//!         │
//!         │ dispatch
//!         ▼
//! payment::record_payment(db, config, ..) -> Result<Outcome, ApiError>
//!         │
//!         ▼
//! {"success":true,"order_id":9,"total_amount":25000,"payment_id":4,...}
//! ```
//!
//! Failures never escape as anything but an `Outcome` with `success: false`,
//! a `code` and a `message`.

pub mod cart;
pub mod order;
pub mod payment;
pub mod prescription;
pub mod stock;

use apotheca_core::{
    BranchId, CustomerId, Money, OrderId, OrderStatus, PaymentId, PaymentMethodId, PharmacistId,
    PrescriptionId, ProductId,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ApiError, ErrorCode};
use crate::state::{CounterConfig, DbState};

/// A parsed request line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Request {
    AddToCart {
        customer_id: CustomerId,
        product_id: ProductId,
        #[serde(default = "one")]
        quantity: i64,
    },
    ViewCart {
        customer_id: CustomerId,
    },
    RemoveFromCart {
        customer_id: CustomerId,
        product_id: ProductId,
    },
    ClearCart {
        customer_id: CustomerId,
    },
    /// Checks out at `branch_id`, or at the home branch when omitted.
    Checkout {
        customer_id: CustomerId,
        branch_id: Option<BranchId>,
    },
    /// Pays the order; `amount` defaults to the order total.
    RecordPayment {
        order_id: OrderId,
        method_id: PaymentMethodId,
        amount: Option<Money>,
        reference: Option<String>,
    },
    Refund {
        payment_id: PaymentId,
    },
    CancelOrder {
        order_id: OrderId,
    },
    /// Shows an order, or moves it to `status` when given.
    OrderStatus {
        order_id: OrderId,
        status: Option<OrderStatus>,
    },
    /// One SKU when `product_id` is given, otherwise the branch inventory.
    Stock {
        branch_id: Option<BranchId>,
        product_id: Option<ProductId>,
    },
    Restock {
        branch_id: Option<BranchId>,
        product_id: ProductId,
        quantity: i64,
    },
    LowStock {
        branch_id: Option<BranchId>,
        threshold: Option<i64>,
    },
    AddSku {
        branch_id: Option<BranchId>,
        product_id: ProductId,
        quantity: i64,
    },
    SearchStock {
        branch_id: Option<BranchId>,
        term: String,
    },
    /// Catalog products the branch could start carrying.
    NotCarried {
        branch_id: Option<BranchId>,
    },
    /// SKUs restocked in the last `days` days (default 30).
    RestockHistory {
        branch_id: Option<BranchId>,
        #[serde(default = "thirty")]
        days: u32,
    },
    PaymentMethods,
    RegisterPrescription {
        order_id: OrderId,
        prescription_number: String,
        issue_date: NaiveDate,
        notes: Option<String>,
    },
    ValidatePrescription {
        prescription_id: PrescriptionId,
        pharmacist_id: PharmacistId,
    },
    RejectPrescription {
        prescription_id: PrescriptionId,
        pharmacist_id: PharmacistId,
        reason: Option<String>,
    },
}

fn one() -> i64 {
    1
}

fn thirty() -> u32 {
    30
}

/// Result object returned for every request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<PaymentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Outcome {
    pub fn ok() -> Self {
        Outcome {
            success: true,
            ..Outcome::default()
        }
    }

    pub fn failure(err: ApiError) -> Self {
        Outcome {
            success: false,
            code: Some(err.code),
            message: Some(err.message),
            ..Outcome::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches a serializable payload.
    pub fn with_data<T: Serialize>(mut self, data: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(data).map_err(|e| {
            tracing::error!("Response serialization failed: {}", e);
            ApiError::new(ErrorCode::BusinessLogic, "Response could not be encoded")
        })?;
        self.data = Some(value);
        Ok(self)
    }
}

/// Parses one request line and runs it.
pub async fn handle_line(db: &DbState, config: &CounterConfig, line: &str) -> Outcome {
    let request = match serde_json::from_str::<Request>(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "Malformed request");
            return Outcome::failure(ApiError::invalid_request(format!("Malformed request: {e}")));
        }
    };

    dispatch(db, config, request).await
}

/// Runs a parsed request, folding any error into a failure `Outcome`.
pub async fn dispatch(db: &DbState, config: &CounterConfig, request: Request) -> Outcome {
    debug!(?request, "Dispatching");

    let result = match request {
        Request::AddToCart {
            customer_id,
            product_id,
            quantity,
        } => cart::add_to_cart(db, config, customer_id, product_id, quantity).await,
        Request::ViewCart { customer_id } => cart::view_cart(db, config, customer_id).await,
        Request::RemoveFromCart {
            customer_id,
            product_id,
        } => cart::remove_from_cart(db, config, customer_id, product_id).await,
        Request::ClearCart { customer_id } => cart::clear_cart(db, config, customer_id).await,
        Request::Checkout {
            customer_id,
            branch_id,
        } => order::checkout(db, config, customer_id, branch_id).await,
        Request::RecordPayment {
            order_id,
            method_id,
            amount,
            reference,
        } => payment::record_payment(db, config, order_id, method_id, amount, reference).await,
        Request::Refund { payment_id } => payment::refund(db, config, payment_id).await,
        Request::CancelOrder { order_id } => order::cancel_order(db, config, order_id).await,
        Request::OrderStatus { order_id, status } => {
            order::order_status(db, config, order_id, status).await
        }
        Request::Stock {
            branch_id,
            product_id,
        } => stock::stock(db, config, branch_id, product_id).await,
        Request::Restock {
            branch_id,
            product_id,
            quantity,
        } => stock::restock(db, config, branch_id, product_id, quantity).await,
        Request::LowStock {
            branch_id,
            threshold,
        } => stock::low_stock(db, config, branch_id, threshold).await,
        Request::AddSku {
            branch_id,
            product_id,
            quantity,
        } => stock::add_sku(db, config, branch_id, product_id, quantity).await,
        Request::SearchStock { branch_id, term } => {
            stock::search_stock(db, config, branch_id, &term).await
        }
        Request::NotCarried { branch_id } => stock::not_carried(db, config, branch_id).await,
        Request::RestockHistory { branch_id, days } => {
            stock::restock_history(db, config, branch_id, days).await
        }
        Request::PaymentMethods => payment::payment_methods(db).await,
        Request::RegisterPrescription {
            order_id,
            prescription_number,
            issue_date,
            notes,
        } => {
            prescription::register_prescription(db, order_id, prescription_number, issue_date, notes)
                .await
        }
        Request::ValidatePrescription {
            prescription_id,
            pharmacist_id,
        } => prescription::validate_prescription(db, prescription_id, pharmacist_id).await,
        Request::RejectPrescription {
            prescription_id,
            pharmacist_id,
            reason,
        } => {
            prescription::reject_prescription(db, prescription_id, pharmacist_id, reason).await
        }
    };

    result.unwrap_or_else(Outcome::failure)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Counter fixtures: an in-memory pharmacy and a request helper.

    use apotheca_core::{Money, NewBranch, NewProduct};
    use apotheca_db::{Database, DbConfig};

    use super::*;

    pub struct Counter {
        pub db: DbState,
        pub config: CounterConfig,
        pub branch: BranchId,
        pub otc: ProductId,
        pub rx: ProductId,
    }

    impl Counter {
        pub async fn send(&self, json: serde_json::Value) -> Outcome {
            handle_line(&self.db, &self.config, &json.to_string()).await
        }
    }

    /// One branch; an OTC product priced 10 with 10 in stock and a
    /// prescription product priced 5 with 5 in stock.
    pub async fn counter() -> Counter {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let branch = db
            .branches()
            .insert(&NewBranch {
                name: "Central".into(),
                address: None,
                phone: None,
            })
            .await
            .unwrap()
            .branch_id;

        let mut ids = Vec::new();
        for (name, price, rx) in [("Paracetamol 500mg", 10, false), ("Amoxicillin 250mg", 5, true)] {
            let product = db
                .products()
                .insert(&NewProduct {
                    name: name.into(),
                    description: None,
                    category: None,
                    manufacturer: None,
                    unit_price: Money::from_minor(price),
                    requires_prescription: rx,
                })
                .await
                .unwrap();
            ids.push(product.product_id);
        }

        db.stock().add_sku(branch, ids[0], 10).await.unwrap();
        db.stock().add_sku(branch, ids[1], 5).await.unwrap();

        Counter {
            db: DbState::new(db),
            config: CounterConfig {
                home_branch: branch,
                ..CounterConfig::default()
            },
            branch,
            otc: ids[0],
            rx: ids[1],
        }
    }
}
