use serde::{Deserialize, Serialize};

use super::rounding::{apply_rounding, RoundingStrategy, RoundingTarget};

/// Tiered markup bands. These are fixed business rules, not configuration:
/// below `TIER_LOW_CEILING` the low multiplier applies, below
/// `TIER_MID_CEILING` the mid multiplier, and the high multiplier otherwise.
pub const TIER_LOW_CEILING: f64 = 20.0;
pub const TIER_MID_CEILING: f64 = 100.0;
pub const TIER_LOW_MULTIPLIER: f64 = 1.6;
pub const TIER_MID_MULTIPLIER: f64 = 1.4;
pub const TIER_HIGH_MULTIPLIER: f64 = 1.3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarkupType {
    Percentage,
    Fixed,
    Tiered,
}

impl MarkupType {
    /// Applies the markup to `price`. `value` is ignored for tiered markup.
    pub fn apply(self, price: f64, value: f64) -> f64 {
        match self {
            MarkupType::Percentage => price * (1.0 + value / 100.0),
            MarkupType::Fixed => price + value,
            MarkupType::Tiered => price * tier_multiplier(price),
        }
    }
}

fn tier_multiplier(price: f64) -> f64 {
    if price < TIER_LOW_CEILING {
        TIER_LOW_MULTIPLIER
    } else if price < TIER_MID_CEILING {
        TIER_MID_MULTIPLIER
    } else {
        TIER_HIGH_MULTIPLIER
    }
}

/// The line being priced.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceContext<'a> {
    pub price: f64,
    pub category: Option<&'a str>,
    pub supplier: Option<&'a str>,
    pub sku: Option<&'a str>,
}

impl<'a> PriceContext<'a> {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            ..Default::default()
        }
    }

    pub fn category(mut self, category: Option<&'a str>) -> Self {
        self.category = category;
        self
    }

    pub fn supplier(mut self, supplier: Option<&'a str>) -> Self {
        self.supplier = supplier;
        self
    }

    pub fn sku(mut self, sku: Option<&'a str>) -> Self {
        self.sku = sku;
        self
    }
}

/// Optional predicates a rule places on a line. Every field that is set
/// must hold for the rule to apply; blank strings count as unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

impl RuleConditions {
    pub fn is_satisfied_by(&self, ctx: &PriceContext<'_>) -> bool {
        if let Some(min) = self.min_price {
            if ctx.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if ctx.price > max {
                return false;
            }
        }

        text_matches(self.category.as_deref(), ctx.category)
            && text_matches(self.supplier.as_deref(), ctx.supplier)
            && text_matches(self.sku.as_deref(), ctx.sku)
    }

    /// True when no condition is set, i.e. the rule applies to every line.
    pub fn is_unconditional(&self) -> bool {
        self.min_price.is_none()
            && self.max_price.is_none()
            && blank(self.category.as_deref())
            && blank(self.supplier.as_deref())
            && blank(self.sku.as_deref())
    }
}

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

fn text_matches(expected: Option<&str>, actual: Option<&str>) -> bool {
    match expected {
        Some(expected) if !expected.is_empty() => actual == Some(expected),
        _ => true,
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PricingRule {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: RuleConditions,
    pub markup_type: MarkupType,
    #[serde(default)]
    pub markup_value: f64,
    #[serde(default)]
    pub rounding_strategy: RoundingStrategy,
    #[serde(default)]
    pub rounding_target: RoundingTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psychological_ending: Option<String>,
    /// Lower values win.
    #[serde(default)]
    pub priority: i32,
}

impl PricingRule {
    /// Creates an enabled, unconditional rule with no rounding.
    pub fn new(id: &str, name: &str, markup_type: MarkupType, markup_value: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            enabled: true,
            conditions: RuleConditions::default(),
            markup_type,
            markup_value,
            rounding_strategy: RoundingStrategy::None,
            rounding_target: RoundingTarget::Cent,
            psychological_ending: None,
            priority: 0,
        }
    }

    /// Enabled and all conditions hold.
    pub fn is_applicable(&self, ctx: &PriceContext<'_>) -> bool {
        self.enabled && self.conditions.is_satisfied_by(ctx)
    }

    /// Price after markup, before rounding.
    pub fn mark_up(&self, base_price: f64) -> f64 {
        self.markup_type.apply(base_price, self.markup_value)
    }

    /// Markup followed by rounding.
    pub fn apply(&self, base_price: f64) -> f64 {
        self.round(self.mark_up(base_price))
    }

    fn round(&self, price: f64) -> f64 {
        apply_rounding(
            price,
            self.rounding_strategy,
            self.rounding_target,
            self.psychological_ending.as_deref(),
        )
    }
}
