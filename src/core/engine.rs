use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, info, warn};

use super::amortization::resolve_loan_costs;
use super::error::{CalcError, CalcResult};
use super::growth::{HoldingCosts, evaluate_growth_profiles};
use super::purchase::{PurchaseRegime, calculate_purchase_costs, require_price};
use super::rates::{Assumptions, CountryRates};
use super::renting::{RentingScenarioResult, compute_renting_baseline};
use super::running::project_running_costs;
use super::selling::CapitalGainsRule;
use super::types::{
    BatchRequest, BatchResult, PersonalFinanceInputs, RentingScenarioInputs, ScenarioEntry,
    ScenarioInput, ScenarioOutcome, ScenarioResult, ScenarioSettings, ScenarioStatus, Warnings,
};

pub const MAX_HOLDING_YEARS: i64 = 100;

struct ScenarioContext<'a> {
    years_to_sell: u32,
    currency: &'a str,
    assumptions: &'a Assumptions,
    personal_finance: Option<&'a PersonalFinanceInputs>,
    renting_total: Option<f64>,
}

pub fn holding_years(settings: &ScenarioSettings) -> CalcResult<u32> {
    if (1..=MAX_HOLDING_YEARS).contains(&settings.years_to_sell) {
        Ok(settings.years_to_sell as u32)
    } else {
        Err(CalcError::InvalidHoldingPeriod)
    }
}

pub fn parse_request(json: &str) -> CalcResult<BatchRequest> {
    serde_json::from_str(json).map_err(|e| CalcError::MalformedRequest(e.to_string()))
}

pub fn compute_json(json: &str) -> CalcResult<BatchResult> {
    parse_request(json).map(|request| compute(&request))
}

pub fn compute(request: &BatchRequest) -> BatchResult {
    compute_with(request, evaluate_scenario)
}

fn compute_with<F>(request: &BatchRequest, evaluate: F) -> BatchResult
where
    F: Fn(&ScenarioInput, &ScenarioContext<'_>) -> CalcResult<ScenarioResult>,
{
    let mut global_warnings = Warnings::default();
    let assumptions = Assumptions::resolve(request.assumptions.as_ref(), &mut global_warnings);
    let years = holding_years(&request.scenario_settings);

    let renting_scenario = request
        .renting_scenario_inputs
        .as_ref()
        .and_then(|inputs| renting_baseline(inputs, &years, &mut global_warnings));
    if request.renting_scenario_inputs.is_some() && renting_scenario.is_none() {
        info!("renting comparison skipped");
    }
    let renting_total = renting_scenario.as_ref().map(|r| r.total_renting_cost);

    let mut seen_ids = HashSet::new();
    let mut scenarios = Vec::with_capacity(request.scenarios.len());
    for (index, entry) in request.scenarios.iter().enumerate() {
        let scenario_id = entry
            .scenario_id()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map_or_else(|| format!("scenario-{}", index + 1), str::to_owned);
        if !seen_ids.insert(scenario_id.clone()) {
            global_warnings.push(format!(
                "Duplicate scenario id '{scenario_id}'; results are reported in request order."
            ));
        }

        let status = match (entry, &years) {
            (ScenarioEntry::Malformed { error, .. }, _) => {
                ScenarioStatus::Error(format!("invalid scenario input: {error}"))
            }
            (ScenarioEntry::Valid(_), Err(err)) => ScenarioStatus::Error(err.to_string()),
            (ScenarioEntry::Valid(input), Ok(years_to_sell)) => {
                let ctx = ScenarioContext {
                    years_to_sell: *years_to_sell,
                    currency: &request.scenario_settings.currency,
                    assumptions: &assumptions,
                    personal_finance: request.personal_finance.as_ref(),
                    renting_total,
                };
                match run_isolated(|| evaluate(input, &ctx)) {
                    Ok(result) => ScenarioStatus::Result(Box::new(result)),
                    Err(err) => ScenarioStatus::Error(err.to_string()),
                }
            }
        };

        match &status {
            ScenarioStatus::Result(result) => {
                debug!(scenario_id = %scenario_id, warnings = result.warnings.len(), "scenario computed");
                for warning in &result.warnings {
                    global_warnings.push(format!("[{scenario_id}] {warning}"));
                }
            }
            ScenarioStatus::Error(msg) => {
                warn!(scenario_id = %scenario_id, error = %msg, "scenario failed");
            }
        }
        scenarios.push(ScenarioOutcome {
            scenario_id,
            status,
        });
    }

    debug!(
        scenarios = scenarios.len(),
        failures = scenarios.iter().filter(|s| s.error().is_some()).count(),
        "batch computed"
    );
    BatchResult {
        scenarios,
        global_warnings: global_warnings.into_vec(),
        renting_scenario,
    }
}

fn renting_baseline(
    inputs: &RentingScenarioInputs,
    years: &CalcResult<u32>,
    warnings: &mut Warnings,
) -> Option<RentingScenarioResult> {
    let Ok(years) = years else {
        warnings.push("Renting comparison skipped: the holding period is invalid.");
        return None;
    };
    match compute_renting_baseline(inputs, *years) {
        Ok(Some(result)) => Some(result),
        Ok(None) => {
            warnings.push("Renting comparison skipped: no monthly rent given.");
            None
        }
        Err(err) => {
            warnings.push(format!("Renting comparison skipped: {err}."));
            None
        }
    }
}

fn run_isolated<T>(calculation: impl FnOnce() -> CalcResult<T>) -> CalcResult<T> {
    panic::catch_unwind(AssertUnwindSafe(calculation))
        .unwrap_or_else(|payload| Err(CalcError::Internal(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "calculator panicked".to_string()
    }
}

fn evaluate_scenario(input: &ScenarioInput, ctx: &ScenarioContext<'_>) -> CalcResult<ScenarioResult> {
    let mut warnings = Warnings::default();
    let regime = PurchaseRegime::resolve(input.country, input.property_type)?;
    let rates = ctx.assumptions.rates_for(input.country);
    let price = require_price(input)?;
    let city = resolve_city(input, rates, &mut warnings);

    let purchase = calculate_purchase_costs(input, regime, rates, &mut warnings)?;
    let loan_costs = resolve_loan_costs(
        input,
        regime,
        rates,
        ctx.years_to_sell,
        ctx.assumptions.disbursement_policy,
        &mut warnings,
    )?;
    let running_costs =
        project_running_costs(input, regime, price, rates, ctx.years_to_sell, &mut warnings)?;
    let rule = CapitalGainsRule::resolve(
        input,
        regime,
        rates,
        ctx.personal_finance,
        ctx.years_to_sell,
        &mut warnings,
    );
    if regime.is_under_construction() {
        warnings.push(
            "Under construction: win/loss uses the total investment cost; installment timing is reported but not discounted.",
        );
    }

    let holding = HoldingCosts {
        purchase_price: price,
        total_purchase_costs: purchase.total_purchase_costs,
        total_running_costs: running_costs.total,
        total_loan_interest: loan_costs
            .as_ref()
            .map_or(0.0, |loan| loan.total_interest_paid),
    };
    ensure_finite(holding.total_purchase_costs, "total_purchase_costs")?;
    ensure_finite(holding.total_running_costs, "total_running_costs")?;
    ensure_finite(holding.total_loan_interest, "total_loan_interest")?;

    let growth_scenarios = evaluate_growth_profiles(
        holding,
        ctx.years_to_sell,
        regime.country(),
        &rule,
        rates,
        ctx.renting_total,
        &mut warnings,
    );
    for outcome in growth_scenarios.values() {
        ensure_finite(outcome.selling_price, "selling_price")?;
        ensure_finite(outcome.win_loss, "win_loss")?;
    }

    Ok(ScenarioResult {
        label: format!("{} - {}", title_case(&city), input.property_type.display_name()),
        country: input.country,
        property_type: input.property_type,
        currency: ctx.currency.to_string(),
        years_to_sell: ctx.years_to_sell,
        purchase_costs: purchase,
        loan_costs,
        running_costs,
        growth_scenarios,
        warnings: warnings.into_vec(),
    })
}

fn resolve_city(input: &ScenarioInput, rates: &CountryRates, warnings: &mut Warnings) -> String {
    match input.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(city) => {
            if !rates.is_reference_city(city) {
                warnings.push(format!(
                    "No city-specific rates for '{city}'; {} defaults ({}) used.",
                    input.country.display_name(),
                    title_case(rates.reference_city)
                ));
            }
            city.to_string()
        }
        None => rates.reference_city.to_string(),
    }
}

fn ensure_finite(value: f64, field: &'static str) -> CalcResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CalcError::NonFiniteResult(field))
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
