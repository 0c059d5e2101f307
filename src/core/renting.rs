use serde::Serialize;

use super::error::{CalcError, CalcResult};
use super::types::RentingScenarioInputs;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RentingYear {
    pub year: u32,
    pub rent_cost: f64,
    pub water_cost: f64,
    pub utilities_cost: f64,
    pub parking_cost: f64,
    pub total_annual_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RentingScenarioResult {
    pub years: Vec<RentingYear>,
    pub total_renting_cost: f64,
}

#[derive(Debug, Clone, Copy)]
struct MonthlyItem {
    base_monthly: f64,
    increment: f64,
}

impl MonthlyItem {
    fn parse(name: &str, monthly: Option<f64>, increment: Option<f64>) -> CalcResult<Self> {
        let base_monthly = monthly.unwrap_or(0.0);
        if !base_monthly.is_finite() || base_monthly < 0.0 {
            return Err(CalcError::InvalidInput(format!(
                "monthly {name} must be a non-negative number"
            )));
        }
        let increment = increment.unwrap_or(0.0);
        if !increment.is_finite() || increment <= -1.0 {
            return Err(CalcError::InvalidInput(format!(
                "{name} annual increment must be greater than -1"
            )));
        }
        Ok(Self {
            base_monthly,
            increment,
        })
    }

    fn annual_cost(self, year: u32) -> f64 {
        self.base_monthly * (1.0 + self.increment).powi(year as i32 - 1) * 12.0
    }
}

/// Cost of renting over `years_to_sell` years. Returns `Ok(None)` when no
/// monthly rent is given, which switches the comparison off.
pub fn compute_renting_baseline(
    inputs: &RentingScenarioInputs,
    years_to_sell: u32,
) -> CalcResult<Option<RentingScenarioResult>> {
    if inputs.monthly_rent.is_none() {
        return Ok(None);
    }
    if years_to_sell == 0 {
        return Err(CalcError::InvalidHoldingPeriod);
    }

    let rent = MonthlyItem::parse("rent", inputs.monthly_rent, inputs.rent_increment)?;
    let water = MonthlyItem::parse("water", inputs.monthly_water, inputs.water_increment)?;
    let utilities = MonthlyItem::parse(
        "utilities",
        inputs.monthly_utilities,
        inputs.utilities_increment,
    )?;
    let parking = MonthlyItem::parse("parking", inputs.monthly_parking, inputs.parking_increment)?;

    let years: Vec<RentingYear> = (1..=years_to_sell)
        .map(|year| {
            let rent_cost = rent.annual_cost(year);
            let water_cost = water.annual_cost(year);
            let utilities_cost = utilities.annual_cost(year);
            let parking_cost = parking.annual_cost(year);
            RentingYear {
                year,
                rent_cost,
                water_cost,
                utilities_cost,
                parking_cost,
                total_annual_cost: rent_cost + water_cost + utilities_cost + parking_cost,
            }
        })
        .collect();
    let total_renting_cost = years.iter().map(|y| y.total_annual_cost).sum();

    Ok(Some(RentingScenarioResult {
        years,
        total_renting_cost,
    }))
}
