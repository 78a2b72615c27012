//! Rounding policies applied after markup.
//!
//! `RoundingStrategy` picks the operation, `RoundingTarget` the granularity.
//! Psychological rounding ignores the target entirely.

use serde::{Deserialize, Serialize};

/// Values this close to a whole number of units are treated as that number
/// before ceil/floor, so `1.10` rounded up to the cent stays `1.10`.
const UNIT_SNAP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundingStrategy {
    #[default]
    None,
    Up,
    Down,
    Nearest,
    Psychological,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoundingTarget {
    #[default]
    Cent,
    Nickel,
    Dime,
    Dollar,
}

impl RoundingTarget {
    /// Size of one unit in currency.
    pub fn unit(self) -> f64 {
        match self {
            RoundingTarget::Cent => 0.01,
            RoundingTarget::Nickel => 0.05,
            RoundingTarget::Dime => 0.10,
            RoundingTarget::Dollar => 1.0,
        }
    }

    /// Number of units per currency unit. Dividing by this instead of
    /// multiplying by `unit()` keeps results like `24.0` exact.
    fn units_per_dollar(self) -> f64 {
        match self {
            RoundingTarget::Cent => 100.0,
            RoundingTarget::Nickel => 20.0,
            RoundingTarget::Dime => 10.0,
            RoundingTarget::Dollar => 1.0,
        }
    }
}

impl std::fmt::Display for RoundingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundingStrategy::None => write!(f, "none"),
            RoundingStrategy::Up => write!(f, "up"),
            RoundingStrategy::Down => write!(f, "down"),
            RoundingStrategy::Nearest => write!(f, "nearest"),
            RoundingStrategy::Psychological => write!(f, "psychological"),
        }
    }
}

/// Applies `strategy` to `price`.
///
/// `ending` is only read for [`RoundingStrategy::Psychological`].
pub fn apply_rounding(
    price: f64,
    strategy: RoundingStrategy,
    target: RoundingTarget,
    ending: Option<&str>,
) -> f64 {
    match strategy {
        RoundingStrategy::None => price,
        RoundingStrategy::Up => round_to_unit(price, target, f64::ceil),
        RoundingStrategy::Down => round_to_unit(price, target, f64::floor),
        RoundingStrategy::Nearest => round_to_unit(price, target, f64::round),
        RoundingStrategy::Psychological => price.floor() + psychological_fraction(ending),
    }
}

fn round_to_unit(price: f64, target: RoundingTarget, op: fn(f64) -> f64) -> f64 {
    let steps = target.units_per_dollar();
    let scaled = price * steps;
    let snapped = if (scaled - scaled.round()).abs() < UNIT_SNAP_EPSILON {
        scaled.round()
    } else {
        scaled
    };
    op(snapped) / steps
}

/// Reads an ending such as `".99"` as the fraction `0.99`.
///
/// The ending is prefixed with `"0"` and parsed as a decimal, so `".95"`
/// gives `0.95`, a missing ending gives `0`, and anything that does not
/// parse gives `NaN`.
pub fn psychological_fraction(ending: Option<&str>) -> f64 {
    let ending = ending.unwrap_or("");
    format!("0{}", ending).parse::<f64>().unwrap_or(f64::NAN)
}
