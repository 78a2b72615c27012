//! Supplier category lookup used to seed pricing rules.

use serde::{Deserialize, Serialize};

use super::rule::{MarkupType, PricingRule, RuleConditions};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMapping {
    pub id: String,
    /// Category name as it appears on supplier documents.
    pub supplier_category: String,
    /// Category used in the storefront.
    pub target_category: String,
    /// Markup percentage suggested for the target category.
    #[serde(default)]
    pub default_markup: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl CategoryMapping {
    /// A percentage rule conditioned on the target category.
    pub fn suggest_rule(&self, priority: i32) -> PricingRule {
        let mut rule = PricingRule::new(
            &format!("category-{}", self.id),
            &format!("{} markup", self.target_category),
            MarkupType::Percentage,
            self.default_markup,
        );
        rule.conditions = RuleConditions {
            category: Some(self.target_category.clone()),
            ..Default::default()
        };
        rule.priority = priority;
        rule
    }
}

#[derive(Debug, Clone, Default)]
pub struct CategoryMappings {
    mappings: Vec<CategoryMapping>,
}

impl CategoryMappings {
    pub fn new(mappings: Vec<CategoryMapping>) -> Self {
        Self { mappings }
    }

    pub fn all(&self) -> &[CategoryMapping] {
        &self.mappings
    }

    /// First enabled mapping for `supplier_category`.
    pub fn resolve(&self, supplier_category: &str) -> Option<&CategoryMapping> {
        self.mappings
            .iter()
            .find(|m| m.enabled && m.supplier_category == supplier_category)
    }

    /// Target category for `supplier_category`, if mapped.
    pub fn target_for(&self, supplier_category: &str) -> Option<&str> {
        self.resolve(supplier_category)
            .map(|m| m.target_category.as_str())
    }

    /// Suggested rules for enabled mappings whose target category has no
    /// rule in `existing` yet. Priorities count up from `base_priority`.
    pub fn suggest_rules(&self, existing: &[PricingRule], base_priority: i32) -> Vec<PricingRule> {
        let mut suggestions: Vec<PricingRule> = Vec::new();
        for mapping in self.mappings.iter().filter(|m| m.enabled) {
            let covered = existing
                .iter()
                .chain(suggestions.iter())
                .any(|rule| {
                    rule.conditions.category.as_deref() == Some(mapping.target_category.as_str())
                });
            if covered {
                continue;
            }
            let priority = base_priority + suggestions.len() as i32;
            suggestions.push(mapping.suggest_rule(priority));
        }
        suggestions
    }
}
