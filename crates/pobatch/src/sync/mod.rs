//! Hand-off of approved orders to the product catalogue.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BulkProcessingConfig;
use crate::error::SyncError;
use crate::job::ParsedPurchaseOrder;
use crate::pricing::PricedLine;

/// Processing flags the engine does not act on itself; they travel with
/// every approved order for the sink to honour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    pub update_existing_products: bool,
    pub create_missing_categories: bool,
    pub generate_descriptions: bool,
    pub optimize_images: bool,
    pub backup_before_processing: bool,
}

impl From<&BulkProcessingConfig> for SyncOptions {
    fn from(settings: &BulkProcessingConfig) -> Self {
        Self {
            update_existing_products: settings.update_existing_products,
            create_missing_categories: settings.create_missing_categories,
            generate_descriptions: settings.generate_descriptions,
            optimize_images: settings.optimize_images,
            backup_before_processing: settings.backup_before_processing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedOrder {
    pub job_id: String,
    pub filename: String,
    pub order: ParsedPurchaseOrder,
    pub lines: Vec<PricedLine>,
    pub options: SyncOptions,
    pub approved_at: DateTime<Utc>,
}

impl ApprovedOrder {
    /// Sum of sell price times quantity.
    pub fn sell_value(&self) -> f64 {
        self.lines
            .iter()
            .map(|line| line.sell_price * f64::from(line.quantity))
            .sum()
    }
}

#[async_trait]
pub trait OrderSink: Send + Sync {
    async fn submit(&self, order: ApprovedOrder) -> Result<(), SyncError>;
}

/// Collects submitted orders in memory.
#[derive(Default)]
pub struct MemoryOrderSink {
    orders: Mutex<Vec<ApprovedOrder>>,
}

impl MemoryOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> Vec<ApprovedOrder> {
        match self.orders.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.orders().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OrderSink for MemoryOrderSink {
    async fn submit(&self, order: ApprovedOrder) -> Result<(), SyncError> {
        let mut guard = self.orders.lock().unwrap_or_else(|poisoned| {
            log::warn!("Order sink mutex was poisoned, recovering");
            poisoned.into_inner()
        });
        log::debug!("Accepted order {} from {}", order.order.po_number, order.filename);
        guard.push(order);
        Ok(())
    }
}
