//! Rule-based sell-price calculation.
//!
//! Pure and synchronous: every function here is safe to call from any
//! number of threads.

pub mod category;
pub mod engine;
pub mod rounding;
pub mod rule;
pub mod validation;

pub use category::{CategoryMapping, CategoryMappings};
pub use engine::{calculate_price, select_rule, PriceQuote, PricedLine, PricingEngine};
pub use rounding::{apply_rounding, psychological_fraction, RoundingStrategy, RoundingTarget};
pub use rule::{MarkupType, PriceContext, PricingRule, RuleConditions};
pub use validation::{validate_rule, validate_rules};
