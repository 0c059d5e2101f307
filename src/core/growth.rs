use std::collections::BTreeMap;

use serde::Serialize;

use super::rates::CountryRates;
use super::selling::{CapitalGainsRule, SellingCosts, calculate_selling_costs};
use super::types::{Country, GrowthProfile, Warnings};

impl GrowthProfile {
    pub fn annual_rate(self, rates: &CountryRates) -> f64 {
        match self {
            GrowthProfile::ZeroGrowth => 0.0,
            GrowthProfile::Average => rates.avg_appreciation_rate,
            GrowthProfile::LowRisk => {
                (rates.avg_appreciation_rate - rates.appreciation_std_dev).max(0.0)
            }
            GrowthProfile::HighRisk => rates.avg_appreciation_rate + rates.appreciation_std_dev,
        }
    }
}

pub fn project_selling_price(price: f64, annual_rate: f64, years: u32) -> f64 {
    if annual_rate == 0.0 {
        return price;
    }
    price * (1.0 + annual_rate).powi(years as i32)
}

#[derive(Debug, Clone, Copy)]
pub struct HoldingCosts {
    pub purchase_price: f64,
    pub total_purchase_costs: f64,
    pub total_running_costs: f64,
    pub total_loan_interest: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthOutcome {
    pub annual_rate: f64,
    pub selling_price: f64,
    pub selling_costs: SellingCosts,
    pub total_costs: f64,
    pub win_loss: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_adjusted_profit: Option<f64>,
}

pub fn evaluate_growth_profiles(
    costs: HoldingCosts,
    years_to_sell: u32,
    country: Country,
    rule: &CapitalGainsRule,
    rates: &CountryRates,
    renting_total: Option<f64>,
    warnings: &mut Warnings,
) -> BTreeMap<GrowthProfile, GrowthOutcome> {
    GrowthProfile::ALL
        .into_iter()
        .map(|profile| {
            let annual_rate = profile.annual_rate(rates);
            let selling_price =
                project_selling_price(costs.purchase_price, annual_rate, years_to_sell);
            let selling_costs = calculate_selling_costs(
                selling_price,
                costs.total_purchase_costs,
                country,
                rule,
                rates,
                warnings,
            );
            let win_loss = selling_price
                - costs.total_purchase_costs
                - costs.total_running_costs
                - selling_costs.total
                - costs.total_loan_interest;
            let outcome = GrowthOutcome {
                annual_rate,
                selling_price,
                total_costs: costs.total_running_costs
                    + costs.total_loan_interest
                    + selling_costs.total,
                selling_costs,
                win_loss,
                index_adjusted_profit: renting_total.map(|renting| win_loss + renting),
            };
            (profile, outcome)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn spain_rule(rates: &CountryRates) -> CapitalGainsRule {
        CapitalGainsRule::SpainProgressive {
            brackets: rates.capital_gains_brackets.clone(),
        }
    }

    fn holding(price: f64) -> HoldingCosts {
        HoldingCosts {
            purchase_price: price,
            total_purchase_costs: price * 1.12,
            total_running_costs: 12_000.0,
            total_loan_interest: 20_000.0,
        }
    }

    #[test]
    fn profile_rates_derive_from_average_and_spread() {
        let rates = CountryRates::denmark();
        assert_eq!(GrowthProfile::ZeroGrowth.annual_rate(&rates), 0.0);
        assert_approx(GrowthProfile::Average.annual_rate(&rates), 0.04);
        assert_approx(GrowthProfile::LowRisk.annual_rate(&rates), 0.0);
        assert_approx(GrowthProfile::HighRisk.annual_rate(&rates), 0.10);

        let mut narrow = CountryRates::spain();
        narrow.appreciation_std_dev = 0.01;
        assert_approx(GrowthProfile::LowRisk.annual_rate(&narrow), 0.02);
    }

    #[test]
    fn selling_price_compounds_annually() {
        assert_approx(project_selling_price(100_000.0, 0.10, 2), 121_000.0);
        assert_eq!(project_selling_price(100_000.0, 0.0, 30), 100_000.0);
    }

    #[test]
    fn win_loss_subtracts_every_cost_category() {
        let rates = CountryRates::spain();
        let mut warnings = Warnings::default();
        let outcomes = evaluate_growth_profiles(
            holding(300_000.0),
            5,
            Country::Spain,
            &spain_rule(&rates),
            &rates,
            None,
            &mut warnings,
        );
        assert_eq!(outcomes.len(), 4);

        let zero = &outcomes[&GrowthProfile::ZeroGrowth];
        assert_eq!(zero.selling_price, 300_000.0);
        let expected = 300_000.0 - 336_000.0 - 12_000.0 - zero.selling_costs.total - 20_000.0;
        assert_approx(zero.win_loss, expected);
        assert_approx(zero.total_costs, 12_000.0 + 20_000.0 + zero.selling_costs.total);
        assert!(zero.index_adjusted_profit.is_none());

        let high = &outcomes[&GrowthProfile::HighRisk];
        assert!(high.selling_price > outcomes[&GrowthProfile::Average].selling_price);
    }

    #[test]
    fn index_adjustment_is_per_profile() {
        let rates = CountryRates::denmark();
        let mut warnings = Warnings::default();
        let outcomes = evaluate_growth_profiles(
            holding(3_000_000.0),
            10,
            Country::Denmark,
            &CapitalGainsRule::DenmarkFlat { rate: 0.42 },
            &rates,
            Some(1_500_000.0),
            &mut warnings,
        );
        for outcome in outcomes.values() {
            assert_eq!(
                outcome.index_adjusted_profit,
                Some(outcome.win_loss + 1_500_000.0)
            );
        }
        assert_ne!(
            outcomes[&GrowthProfile::ZeroGrowth].index_adjusted_profit,
            outcomes[&GrowthProfile::HighRisk].index_adjusted_profit
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_zero_growth_keeps_purchase_price(
            price in 1u32..50_000_000,
            years in 1u32..60
        ) {
            let rates = CountryRates::spain();
            let mut warnings = Warnings::default();
            let outcomes = evaluate_growth_profiles(
                holding(price as f64),
                years,
                Country::Spain,
                &spain_rule(&rates),
                &rates,
                None,
                &mut warnings,
            );
            prop_assert_eq!(outcomes[&GrowthProfile::ZeroGrowth].selling_price, price as f64);
        }

        #[test]
        fn prop_index_adjusted_profit_adds_renting_cost(
            price in 50_000u32..5_000_000,
            years in 1u32..40,
            renting in 0u32..3_000_000
        ) {
            let rates = CountryRates::denmark();
            let mut warnings = Warnings::default();
            let outcomes = evaluate_growth_profiles(
                holding(price as f64),
                years,
                Country::Denmark,
                &CapitalGainsRule::DenmarkFlat { rate: 0.42 },
                &rates,
                Some(renting as f64),
                &mut warnings,
            );
            for outcome in outcomes.values() {
                let adjusted = outcome.index_adjusted_profit.expect("baseline present");
                prop_assert!((adjusted - (outcome.win_loss + renting as f64)).abs() <= 1e-9);
            }
        }
    }
}
