use serde::{Deserialize, Serialize};

use crate::job::ParsedPurchaseOrder;

use super::rule::{PriceContext, PricingRule};

/// Picks the rule that prices a line: the applicable rule with the lowest
/// priority, first in `rules` order on ties.
pub fn select_rule<'r>(
    base_price: f64,
    category: Option<&str>,
    supplier: Option<&str>,
    sku: Option<&str>,
    rules: &'r [PricingRule],
) -> Option<&'r PricingRule> {
    let ctx = PriceContext::new(base_price)
        .category(category)
        .supplier(supplier)
        .sku(sku);

    // min_by_key keeps the first of equal keys
    rules
        .iter()
        .filter(|rule| rule.is_applicable(&ctx))
        .min_by_key(|rule| rule.priority)
}

/// Sell price for `base_price`. Returns `base_price` untouched when no rule
/// applies. Malformed rules are not rejected here and may yield `NaN`.
pub fn calculate_price(
    base_price: f64,
    category: Option<&str>,
    supplier: Option<&str>,
    sku: Option<&str>,
    rules: &[PricingRule],
) -> f64 {
    match select_rule(base_price, category, supplier, sku, rules) {
        Some(rule) => rule.apply(base_price),
        None => base_price,
    }
}

/// Result of pricing a single line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub base_price: f64,
    pub marked_up: f64,
    pub final_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

/// A parsed order line with its sell price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricedLine {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub cost_price: f64,
    pub sell_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
}

/// Rule set sorted once by priority, for pricing many lines.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    rules: Vec<PricingRule>,
}

impl PricingEngine {
    pub fn new(mut rules: Vec<PricingRule>) -> Self {
        // Stable sort keeps insertion order among equal priorities
        rules.sort_by_key(|rule| rule.priority);
        Self { rules }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[PricingRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn select(&self, ctx: &PriceContext<'_>) -> Option<&PricingRule> {
        self.rules.iter().find(|rule| rule.is_applicable(ctx))
    }

    pub fn price(&self, ctx: &PriceContext<'_>) -> f64 {
        self.quote(ctx).final_price
    }

    pub fn quote(&self, ctx: &PriceContext<'_>) -> PriceQuote {
        match self.select(ctx) {
            Some(rule) => {
                let marked_up = rule.mark_up(ctx.price);
                PriceQuote {
                    base_price: ctx.price,
                    marked_up,
                    final_price: rule.apply(ctx.price),
                    rule_id: Some(rule.id.clone()),
                }
            }
            None => PriceQuote {
                base_price: ctx.price,
                marked_up: ctx.price,
                final_price: ctx.price,
                rule_id: None,
            },
        }
    }

    /// Prices every line of `order` using the order's supplier and each
    /// line's SKU. `category` applies to the whole order when known.
    pub fn price_order(
        &self,
        order: &ParsedPurchaseOrder,
        category: Option<&str>,
    ) -> Vec<PricedLine> {
        order
            .items
            .iter()
            .map(|item| {
                let ctx = PriceContext::new(item.price)
                    .category(category)
                    .supplier(Some(order.supplier.as_str()))
                    .sku(Some(item.sku.as_str()));
                let quote = self.quote(&ctx);
                PricedLine {
                    sku: item.sku.clone(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    cost_price: item.price,
                    sell_price: quote.final_price,
                    rule_id: quote.rule_id,
                }
            })
            .collect()
    }
}
