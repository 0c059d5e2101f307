use std::collections::BTreeMap;

use serde::Serialize;

use super::purchase::PurchaseRegime;
use super::rates::{CountryRates, TaxBracket};
use super::types::{Country, PersonalFinanceInputs, ScenarioInput, Warnings};

#[derive(Debug, Clone, PartialEq)]
pub enum CapitalGainsRule {
    SpainProgressive { brackets: Vec<TaxBracket> },
    SpainBeckham { rate: f64 },
    DenmarkFlat { rate: f64 },
    DenmarkExempt,
}

impl CapitalGainsRule {
    pub fn resolve(
        input: &ScenarioInput,
        regime: PurchaseRegime,
        rates: &CountryRates,
        personal: Option<&PersonalFinanceInputs>,
        years_to_sell: u32,
        warnings: &mut Warnings,
    ) -> Self {
        match regime.country() {
            Country::Spain => {
                let remaining_at_sale = input
                    .beckham_law_remaining_years
                    .saturating_sub(years_to_sell);
                if input.beckham_law_active && remaining_at_sale > 0 {
                    Self::SpainBeckham {
                        rate: rates.beckham_law_rate,
                    }
                } else {
                    if input.beckham_law_active {
                        warnings.push(
                            "Beckham law expires before the sale; standard capital gains rates applied.",
                        );
                    }
                    Self::SpainProgressive {
                        brackets: rates.capital_gains_brackets.clone(),
                    }
                }
            }
            Country::Denmark => {
                if input.beckham_law_active {
                    warnings.push("Beckham law only applies in Spain; ignored for this scenario.");
                }
                if input.primary_residence {
                    return Self::DenmarkExempt;
                }
                let override_rate = personal
                    .and_then(|p| p.tax_rate_override)
                    .filter(|rate| rate.is_finite() && (0.0..=1.0).contains(rate));
                Self::DenmarkFlat {
                    rate: override_rate.unwrap_or(rates.capital_gains_flat_rate),
                }
            }
        }
    }

    pub fn tax_on_gain(&self, gain: f64) -> f64 {
        if gain <= 0.0 {
            return 0.0;
        }
        match self {
            Self::SpainProgressive { brackets } => progressive_tax(gain, brackets),
            Self::SpainBeckham { rate } | Self::DenmarkFlat { rate } => gain * rate,
            Self::DenmarkExempt => 0.0,
        }
    }

    fn proxy_warning(&self) -> String {
        match self {
            Self::SpainProgressive { .. } => {
                "Spain capital gains tax is a simplified progressive savings-rate approximation.".to_string()
            }
            Self::SpainBeckham { rate } => format!(
                "Spain capital gains tax uses the Beckham law flat rate ({:.0}%) as an approximation.",
                rate * 100.0
            ),
            Self::DenmarkFlat { rate } => format!(
                "Denmark capital gains tax is a simplified flat rate ({:.0}%); a primary residence may be exempt.",
                rate * 100.0
            ),
            Self::DenmarkExempt => {
                "Denmark capital gains treated as exempt (primary residence).".to_string()
            }
        }
    }
}

pub fn progressive_tax(amount: f64, brackets: &[TaxBracket]) -> f64 {
    if amount <= 0.0 {
        return 0.0;
    }
    let mut tax = 0.0;
    let mut last_limit = 0.0;
    for bracket in brackets {
        let taxable = (amount.min(bracket.limit) - last_limit).max(0.0);
        tax += taxable * bracket.rate;
        if amount <= bracket.limit {
            break;
        }
        last_limit = bracket.limit;
    }
    tax
}

#[derive(Debug, Clone, Serialize)]
pub struct SellingCosts {
    pub breakdown: BTreeMap<String, f64>,
    pub capital_gain: f64,
    pub total: f64,
}

/// Disposal costs at `sale_price`. The taxable gain is measured against
/// `cost_basis` (price plus acquisition taxes, fees and renovations).
pub fn calculate_selling_costs(
    sale_price: f64,
    cost_basis: f64,
    country: Country,
    rule: &CapitalGainsRule,
    rates: &CountryRates,
    warnings: &mut Warnings,
) -> SellingCosts {
    let mut breakdown = BTreeMap::new();
    if sale_price <= 0.0 {
        return SellingCosts {
            breakdown,
            capital_gain: 0.0,
            total: 0.0,
        };
    }

    let agency_fee = sale_price * rates.selling_agency_fee_rate;
    breakdown.insert("selling_agency_fee".to_string(), agency_fee);
    let mut total = agency_fee;

    let capital_gain = (sale_price - cost_basis).max(0.0);
    if capital_gain > 0.0 && country == Country::Spain {
        breakdown.insert(
            "selling_plusvalia_municipal".to_string(),
            rates.plusvalia_placeholder,
        );
        total += rates.plusvalia_placeholder;
        warnings.push("Spain plusvalía municipal is a flat placeholder, not a cadastral calculation.");
    }

    let capital_gains_tax = rule.tax_on_gain(capital_gain);
    breakdown.insert("capital_gains_tax".to_string(), capital_gains_tax);
    total += capital_gains_tax;
    warnings.push(rule.proxy_warning());

    SellingCosts {
        breakdown,
        capital_gain,
        total,
    }
}
