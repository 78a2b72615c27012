//! Rule checks run when rules are loaded, never during evaluation.

use std::collections::HashSet;

use crate::error::PricingError;

use super::rounding::RoundingStrategy;
use super::rule::{MarkupType, PricingRule};

pub fn validate_rule(rule: &PricingRule) -> Result<(), PricingError> {
    // A negative fixed amount is a discount
    let negative_allowed = rule.markup_type == MarkupType::Fixed;
    if !rule.markup_value.is_finite() || (rule.markup_value < 0.0 && !negative_allowed) {
        return Err(PricingError::InvalidMarkup {
            id: rule.id.clone(),
            value: rule.markup_value,
        });
    }

    let min = rule.conditions.min_price;
    let max = rule.conditions.max_price;
    let bounds_ok = min.map_or(true, f64::is_finite)
        && max.map_or(true, f64::is_finite)
        && match (min, max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        };
    if !bounds_ok {
        return Err(PricingError::InvalidPriceBounds {
            id: rule.id.clone(),
            min,
            max,
        });
    }

    if rule.rounding_strategy == RoundingStrategy::Psychological
        && !is_valid_ending(rule.psychological_ending.as_deref())
    {
        return Err(PricingError::InvalidPsychologicalEnding {
            id: rule.id.clone(),
            ending: rule.psychological_ending.clone(),
        });
    }

    Ok(())
}

pub fn validate_rules(rules: &[PricingRule]) -> Result<(), PricingError> {
    let mut ids = HashSet::new();
    for rule in rules {
        if !ids.insert(rule.id.as_str()) {
            return Err(PricingError::DuplicateRuleId(rule.id.clone()));
        }
        validate_rule(rule)?;
    }
    Ok(())
}

/// A dot followed by one to three digits, e.g. `.99` or `.5`.
fn is_valid_ending(ending: Option<&str>) -> bool {
    match ending.and_then(|e| e.strip_prefix('.')) {
        Some(digits) => (1..=3).contains(&digits.len()) && digits.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}
