//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use pobatch::job::{ParsedItem, ParsedPurchaseOrder, UploadedFile};
use pobatch::pricing::{MarkupType, PricingRule, RoundingStrategy, RoundingTarget};

/// Builder for creating `PricingRule` instances.
pub struct RuleBuilder {
    rule: PricingRule,
}

impl RuleBuilder {
    /// Percentage markup rule with priority 0.
    pub fn percentage(id: &str, value: f64) -> Self {
        Self::new(id, MarkupType::Percentage, value)
    }

    pub fn fixed(id: &str, value: f64) -> Self {
        Self::new(id, MarkupType::Fixed, value)
    }

    pub fn tiered(id: &str) -> Self {
        Self::new(id, MarkupType::Tiered, 0.0)
    }

    pub fn new(id: &str, markup_type: MarkupType, value: f64) -> Self {
        Self {
            rule: PricingRule::new(id, id, markup_type, value),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.rule.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.rule.enabled = false;
        self
    }

    pub fn min_price(mut self, min: f64) -> Self {
        self.rule.conditions.min_price = Some(min);
        self
    }

    pub fn max_price(mut self, max: f64) -> Self {
        self.rule.conditions.max_price = Some(max);
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.rule.conditions.category = Some(category.to_string());
        self
    }

    pub fn supplier(mut self, supplier: &str) -> Self {
        self.rule.conditions.supplier = Some(supplier.to_string());
        self
    }

    pub fn sku(mut self, sku: &str) -> Self {
        self.rule.conditions.sku = Some(sku.to_string());
        self
    }

    pub fn rounding(mut self, strategy: RoundingStrategy, target: RoundingTarget) -> Self {
        self.rule.rounding_strategy = strategy;
        self.rule.rounding_target = target;
        self
    }

    pub fn psychological(mut self, ending: &str) -> Self {
        self.rule.rounding_strategy = RoundingStrategy::Psychological;
        self.rule.psychological_ending = Some(ending.to_string());
        self
    }

    pub fn build(self) -> PricingRule {
        self.rule
    }
}

/// Builder for creating `ParsedPurchaseOrder` instances.
pub struct OrderBuilder {
    supplier: String,
    po_number: String,
    items: Vec<ParsedItem>,
}

impl OrderBuilder {
    pub fn new(po_number: &str) -> Self {
        Self {
            supplier: "Acme Wholesale".to_string(),
            po_number: po_number.to_string(),
            items: vec![],
        }
    }

    pub fn supplier(mut self, supplier: &str) -> Self {
        self.supplier = supplier.to_string();
        self
    }

    pub fn item(mut self, sku: &str, quantity: u32, price: f64, confidence: f64) -> Self {
        self.items.push(ParsedItem {
            sku: sku.to_string(),
            name: format!("Item {sku}"),
            quantity,
            price,
            confidence,
        });
        self
    }

    pub fn build(self) -> ParsedPurchaseOrder {
        ParsedPurchaseOrder::from_items(&self.supplier, &self.po_number, "2024-03-01", self.items)
    }
}

/// An order whose average confidence is exactly `confidence`.
pub fn order_with_confidence(po_number: &str, confidence: f64) -> ParsedPurchaseOrder {
    OrderBuilder::new(po_number)
        .item("SKU-1", 4, 10.0, confidence)
        .build()
}

/// A PDF upload of 1 KiB.
pub fn upload(name: &str) -> UploadedFile {
    UploadedFile::new(name, 1024, &format!("blob://{name}"))
}

pub fn uploads(names: &[&str]) -> Vec<UploadedFile> {
    names.iter().map(|name| upload(name)).collect()
}
