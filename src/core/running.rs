use std::collections::BTreeMap;

use serde::Serialize;

use super::error::{CalcError, CalcResult};
use super::purchase::PurchaseRegime;
use super::rates::CountryRates;
use super::types::{Country, ScenarioInput, Warnings};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunningCostCategory {
    PropertyTaxIbi,
    PropertyTaxEjendomsskat,
    PropertyValueTaxEjendomsvaerdiskat,
    CommunityFees,
}

#[derive(Debug, Clone, Copy)]
struct CostLine {
    category: RunningCostCategory,
    annual_base: f64,
    escalation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunningCosts {
    pub breakdown_annual: BTreeMap<RunningCostCategory, f64>,
    pub breakdown_total: BTreeMap<RunningCostCategory, f64>,
    pub total: f64,
    pub years_charged: u32,
}

fn cost_lines(country: Country, price: f64, rates: &CountryRates) -> Vec<CostLine> {
    let community = CostLine {
        category: RunningCostCategory::CommunityFees,
        annual_base: rates.community_fee_monthly * 12.0,
        escalation: rates.community_fee_escalation,
    };
    match country {
        Country::Spain => vec![
            CostLine {
                category: RunningCostCategory::PropertyTaxIbi,
                annual_base: price * rates.property_tax_base_share * rates.property_tax_rate,
                escalation: rates.property_tax_escalation,
            },
            community,
        ],
        Country::Denmark => vec![
            CostLine {
                category: RunningCostCategory::PropertyTaxEjendomsskat,
                annual_base: price * rates.property_tax_base_share * rates.property_tax_rate,
                escalation: rates.property_tax_escalation,
            },
            CostLine {
                category: RunningCostCategory::PropertyValueTaxEjendomsvaerdiskat,
                annual_base: price * rates.property_value_tax_rate,
                escalation: rates.property_tax_escalation,
            },
            community,
        ],
    }
}

fn proxy_warning(country: Country, rates: &CountryRates) -> String {
    match country {
        Country::Spain => format!(
            "Spain running costs use a proxy cadastral value ({:.0}% of price) for the IBI calculation.",
            rates.property_tax_base_share * 100.0
        ),
        Country::Denmark => format!(
            "Denmark running costs use proxy values for tax calculations: land value at {:.0}% of price for ejendomsskat, full price for ejendomsværdiskat.",
            rates.property_tax_base_share * 100.0
        ),
    }
}

/// Recurring ownership costs over `years_to_sell` years. Under-construction
/// properties are charged only for years after completion; year `y` of the
/// hold costs `annual_base * (1 + escalation)^(y - 1)`.
pub fn project_running_costs(
    input: &ScenarioInput,
    regime: PurchaseRegime,
    price: f64,
    rates: &CountryRates,
    years_to_sell: u32,
    warnings: &mut Warnings,
) -> CalcResult<RunningCosts> {
    if years_to_sell == 0 {
        return Err(CalcError::InvalidHoldingPeriod);
    }

    let country = regime.country();
    let completion_years = if regime.is_under_construction() {
        if input.construction_completion_years.is_none() {
            warnings.push(
                "Under construction without a completion horizon: running costs charged from year 1.",
            );
        }
        input.construction_completion_years.unwrap_or(0)
    } else {
        0
    };
    if completion_years >= years_to_sell {
        warnings.push(
            "Property is sold before construction completes; no running costs are charged.",
        );
    }

    let lines = cost_lines(country, price, rates);
    warnings.push(proxy_warning(country, rates));

    let mut breakdown_annual = BTreeMap::new();
    let mut breakdown_total = BTreeMap::new();
    let mut total = 0.0;
    for line in &lines {
        breakdown_annual.insert(line.category, line.annual_base);
        let summed: f64 = (completion_years.saturating_add(1)..=years_to_sell)
            .map(|year| line.annual_base * (1.0 + line.escalation).powi(year as i32 - 1))
            .sum();
        breakdown_total.insert(line.category, summed);
        total += summed;
    }

    Ok(RunningCosts {
        breakdown_annual,
        breakdown_total,
        total,
        years_charged: years_to_sell.saturating_sub(completion_years),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PropertyType;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn project(
        input: &ScenarioInput,
        rates: &CountryRates,
        years: u32,
    ) -> (CalcResult<RunningCosts>, Warnings) {
        let regime = PurchaseRegime::resolve(input.country, input.property_type).expect("regime");
        let mut warnings = Warnings::default();
        let price = input.price.expect("price");
        let costs = project_running_costs(input, regime, price, rates, years, &mut warnings);
        (costs, warnings)
    }

    fn scenario(country: Country, property_type: PropertyType, price: f64) -> ScenarioInput {
        let mut input = ScenarioInput::new("test", country, property_type);
        input.price = Some(price);
        input
    }

    #[test]
    fn spain_flat_costs_multiply_by_years() {
        let input = scenario(Country::Spain, PropertyType::New, 300_000.0);
        let (costs, warnings) = project(&input, &CountryRates::spain(), 5);
        let costs = costs.expect("valid");

        let ibi = 300_000.0 * 0.5 * 0.007;
        assert_approx(costs.breakdown_annual[&RunningCostCategory::PropertyTaxIbi], ibi);
        assert_approx(costs.breakdown_annual[&RunningCostCategory::CommunityFees], 1_200.0);
        assert_approx(costs.breakdown_total[&RunningCostCategory::PropertyTaxIbi], ibi * 5.0);
        assert_approx(costs.total, (ibi + 1_200.0) * 5.0);
        assert_eq!(costs.years_charged, 5);
        assert!(warnings.contains("IBI"));
    }

    #[test]
    fn denmark_has_three_categories() {
        let input = scenario(Country::Denmark, PropertyType::Ejer, 3_000_000.0);
        let (costs, warnings) = project(&input, &CountryRates::denmark(), 3);
        let costs = costs.expect("valid");

        assert_eq!(costs.breakdown_annual.len(), 3);
        assert_approx(
            costs.breakdown_annual[&RunningCostCategory::PropertyTaxEjendomsskat],
            3_000_000.0 * 0.3 * 0.0092,
        );
        assert_approx(
            costs.breakdown_annual[&RunningCostCategory::PropertyValueTaxEjendomsvaerdiskat],
            3_000_000.0 * 0.0051,
        );
        assert_approx(costs.breakdown_annual[&RunningCostCategory::CommunityFees], 18_000.0);
        assert!(warnings.contains("Denmark running costs use proxy values"));
    }

    #[test]
    fn escalation_compounds_from_year_two() {
        let input = scenario(Country::Spain, PropertyType::New, 300_000.0);
        let mut rates = CountryRates::spain();
        rates.community_fee_escalation = 0.10;
        let (costs, _) = project(&input, &rates, 3);
        let costs = costs.expect("valid");

        assert_approx(costs.breakdown_annual[&RunningCostCategory::CommunityFees], 1_200.0);
        assert_approx(
            costs.breakdown_total[&RunningCostCategory::CommunityFees],
            1_200.0 + 1_320.0 + 1_452.0,
        );
    }

    #[test]
    fn under_construction_is_charged_only_after_completion() {
        let mut input = scenario(Country::Spain, PropertyType::UnderConstruction, 300_000.0);
        input.construction_completion_years = Some(2);
        let mut rates = CountryRates::spain();
        rates.community_fee_escalation = 0.10;
        let (costs, _) = project(&input, &rates, 5);
        let costs = costs.expect("valid");

        assert_eq!(costs.years_charged, 3);
        // Years 3, 4 and 5 are charged at their calendar escalation.
        let expected = 1_200.0 * (1.1f64.powi(2) + 1.1f64.powi(3) + 1.1f64.powi(4));
        assert_approx(costs.breakdown_total[&RunningCostCategory::CommunityFees], expected);
    }

    #[test]
    fn sale_before_completion_charges_nothing() {
        let mut input = scenario(Country::Denmark, PropertyType::UnderConstruction, 2_000_000.0);
        input.construction_completion_years = Some(4);
        let (costs, warnings) = project(&input, &CountryRates::denmark(), 3);
        let costs = costs.expect("valid");

        assert_eq!(costs.years_charged, 0);
        assert_eq!(costs.total, 0.0);
        assert!(costs.breakdown_annual[&RunningCostCategory::CommunityFees] > 0.0);
        assert!(warnings.contains("sold before construction completes"));
    }

    #[test]
    fn far_completion_horizon_charges_nothing() {
        let mut input = scenario(Country::Spain, PropertyType::UnderConstruction, 300_000.0);
        input.construction_completion_years = Some(u32::MAX);
        let (costs, warnings) = project(&input, &CountryRates::spain(), 5);
        let costs = costs.expect("valid");

        assert_eq!(costs.years_charged, 0);
        assert_eq!(costs.total, 0.0);
        assert!(
            costs
                .breakdown_total
                .values()
                .all(|total| *total == 0.0)
        );
        assert!(warnings.contains("sold before construction completes"));
    }

    #[test]
    fn zero_holding_period_is_rejected() {
        let input = scenario(Country::Spain, PropertyType::New, 300_000.0);
        let (costs, _) = project(&input, &CountryRates::spain(), 0);
        assert!(matches!(costs, Err(CalcError::InvalidHoldingPeriod)));
    }

    #[test]
    fn completion_is_ignored_for_finished_property() {
        let mut input = scenario(Country::Spain, PropertyType::New, 300_000.0);
        input.construction_completion_years = Some(3);
        let (costs, _) = project(&input, &CountryRates::spain(), 5);
        assert_eq!(costs.expect("valid").years_charged, 5);
    }
}
