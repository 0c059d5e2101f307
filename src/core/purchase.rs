use std::collections::BTreeMap;

use serde::Serialize;

use super::error::{CalcError, CalcResult};
use super::rates::{CountryRates, DEFAULT_UNDER_CONSTRUCTION_DOWN_PAYMENT};
use super::types::{Country, PaymentScheduleEntry, PropertyType, ScenarioInput, Warnings};

pub const PAYMENT_SCHEDULE_TOLERANCE: f64 = 1e-3;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PurchaseRegime {
    SpainNewBuild,
    SpainUnderConstruction,
    SpainSecondHand,
    DenmarkNewBuild,
    DenmarkUnderConstruction,
    DenmarkEjer,
    DenmarkAndels,
}

impl PurchaseRegime {
    pub fn resolve(country: Country, property_type: PropertyType) -> CalcResult<Self> {
        match (country, property_type) {
            (Country::Spain, PropertyType::New) => Ok(Self::SpainNewBuild),
            (Country::Spain, PropertyType::UnderConstruction) => Ok(Self::SpainUnderConstruction),
            (Country::Spain, PropertyType::SecondHand) => Ok(Self::SpainSecondHand),
            (Country::Denmark, PropertyType::New) => Ok(Self::DenmarkNewBuild),
            (Country::Denmark, PropertyType::UnderConstruction) => {
                Ok(Self::DenmarkUnderConstruction)
            }
            (Country::Denmark, PropertyType::Ejer) => Ok(Self::DenmarkEjer),
            (Country::Denmark, PropertyType::Andels) => Ok(Self::DenmarkAndels),
            (country, property_type) => Err(CalcError::UnsupportedPropertyType {
                country: country.as_str(),
                property_type: property_type.as_str(),
            }),
        }
    }

    pub fn country(self) -> Country {
        match self {
            Self::SpainNewBuild | Self::SpainUnderConstruction | Self::SpainSecondHand => {
                Country::Spain
            }
            Self::DenmarkNewBuild
            | Self::DenmarkUnderConstruction
            | Self::DenmarkEjer
            | Self::DenmarkAndels => Country::Denmark,
        }
    }

    pub fn is_under_construction(self) -> bool {
        matches!(
            self,
            Self::SpainUnderConstruction | Self::DenmarkUnderConstruction
        )
    }

    pub fn is_andels(self) -> bool {
        self == Self::DenmarkAndels
    }

    fn transfer_taxes(
        self,
        price: f64,
        rates: &CountryRates,
        breakdown: &mut BTreeMap<String, f64>,
        warnings: &mut Warnings,
    ) -> f64 {
        match self {
            Self::SpainNewBuild | Self::SpainUnderConstruction => {
                let vat = price * rates.vat_rate;
                let ajd = price * rates.ajd_rate;
                breakdown.insert("purchase_tax_vat".into(), vat);
                breakdown.insert("purchase_tax_ajd".into(), ajd);
                vat + ajd
            }
            Self::SpainSecondHand => {
                let itp = price * rates.itp_rate;
                breakdown.insert("purchase_tax_itp".into(), itp);
                itp
            }
            Self::DenmarkNewBuild
            | Self::DenmarkUnderConstruction
            | Self::DenmarkEjer
            | Self::DenmarkAndels => {
                if matches!(self, Self::DenmarkNewBuild | Self::DenmarkUnderConstruction) {
                    warnings.push(
                        "Denmark new-build purchase taxes are simplified: tinglysningsafgift only, VAT assumed included in the price.",
                    );
                }
                let tinglysning = rates.tinglysning_fixed + price * rates.tinglysning_rate;
                breakdown.insert("purchase_tax_tinglysningsafgift".into(), tinglysning);
                tinglysning
            }
        }
    }

    fn fees(
        self,
        price: f64,
        loan_amount: Option<f64>,
        rates: &CountryRates,
        breakdown: &mut BTreeMap<String, f64>,
    ) -> f64 {
        match self.country() {
            Country::Spain => {
                let notary = price * rates.notary_fee_rate;
                let registry = price * rates.registry_fee_rate;
                let lawyer = price * rates.lawyer_fee_rate + rates.lawyer_fee_flat;
                breakdown.insert("notary_fee".into(), notary);
                breakdown.insert("registry_fee".into(), registry);
                breakdown.insert("lawyer_fee".into(), lawyer);
                notary + registry + lawyer
            }
            Country::Denmark => {
                let lawyer = price * rates.lawyer_fee_rate + rates.lawyer_fee_flat;
                breakdown.insert("lawyer_fee".into(), lawyer);
                let registration = match loan_amount {
                    Some(amount) if amount.is_finite() && amount > 0.0 => {
                        let duty =
                            rates.loan_registration_fixed + amount * rates.loan_registration_rate;
                        breakdown.insert("loan_registration_duty".into(), duty);
                        duty
                    }
                    _ => 0.0,
                };
                lawyer + registration
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstallmentDue {
    pub due_year: u32,
    pub percentage: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseCosts {
    pub breakdown: BTreeMap<String, f64>,
    pub total_purchase_costs: f64,
    pub initial_outlay_year0: f64,
    pub upfront_fees_year0: f64,
    pub cash_at_signing: f64,
    pub remaining_payments_value: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub installments: Vec<InstallmentDue>,
}

impl PurchaseCosts {
    pub fn property_price(&self) -> f64 {
        self.breakdown.get("property_price").copied().unwrap_or(0.0)
    }
}

pub fn require_price(input: &ScenarioInput) -> CalcResult<f64> {
    match input.price {
        Some(price) if price.is_finite() && price > 0.0 => Ok(price),
        _ => Err(CalcError::MissingRequiredInput("price")),
    }
}

pub fn validate_payment_schedule(schedule: &[PaymentScheduleEntry]) -> CalcResult<f64> {
    if let Some(bad) = schedule
        .iter()
        .find(|entry| !entry.percentage.is_finite() || !(0.0..=1.0).contains(&entry.percentage))
    {
        return Err(CalcError::InvalidInput(format!(
            "payment schedule percentage {} is not a fraction between 0 and 1",
            bad.percentage
        )));
    }
    let sum: f64 = schedule.iter().map(|entry| entry.percentage).sum();
    if (sum - 1.0).abs() > PAYMENT_SCHEDULE_TOLERANCE {
        return Err(CalcError::InvalidPaymentSchedule { sum });
    }
    Ok(sum)
}

struct PricePhasing {
    year0_fraction: f64,
    installments: Vec<InstallmentDue>,
}

fn phase_price(
    input: &ScenarioInput,
    regime: PurchaseRegime,
    price: f64,
    warnings: &mut Warnings,
) -> CalcResult<PricePhasing> {
    let schedule = input.payment_schedule.as_deref().unwrap_or_default();

    if !regime.is_under_construction() {
        if !schedule.is_empty() {
            warnings.push(
                "Payment schedule ignored: only under-construction purchases are paid in installments.",
            );
        }
        return Ok(PricePhasing {
            year0_fraction: 1.0,
            installments: Vec::new(),
        });
    }

    if schedule.is_empty() {
        warnings.push(format!(
            "Under construction without a payment schedule: assumed {:.0}% due at signing and the rest at completion.",
            DEFAULT_UNDER_CONSTRUCTION_DOWN_PAYMENT * 100.0
        ));
        let remaining = 1.0 - DEFAULT_UNDER_CONSTRUCTION_DOWN_PAYMENT;
        let due_year = input.construction_completion_years.unwrap_or(1).max(1);
        return Ok(PricePhasing {
            year0_fraction: DEFAULT_UNDER_CONSTRUCTION_DOWN_PAYMENT,
            installments: vec![InstallmentDue {
                due_year,
                percentage: remaining,
                amount: price * remaining,
            }],
        });
    }

    validate_payment_schedule(schedule)?;

    let mut by_year: BTreeMap<u32, f64> = BTreeMap::new();
    for entry in schedule {
        *by_year.entry(entry.due_year).or_insert(0.0) += entry.percentage;
    }
    let year0_fraction = by_year.remove(&0).unwrap_or(0.0);
    let installments = by_year
        .into_iter()
        .map(|(due_year, percentage)| InstallmentDue {
            due_year,
            percentage,
            amount: price * percentage,
        })
        .collect();

    Ok(PricePhasing {
        year0_fraction,
        installments,
    })
}

fn renovation_costs(
    input: &ScenarioInput,
    rates: &CountryRates,
    breakdown: &mut BTreeMap<String, f64>,
    warnings: &mut Warnings,
) -> CalcResult<f64> {
    let mut total = 0.0;
    for item in &input.renovations {
        let kind = match item.kind.trim().to_ascii_lowercase() {
            // "total" is reserved for the aggregate line.
            kind if kind.is_empty() || kind == "total" => "custom".to_string(),
            kind => kind,
        };
        let cost = match item.adjusted_cost {
            Some(cost) if cost.is_finite() && cost >= 0.0 => cost,
            Some(cost) => {
                return Err(CalcError::InvalidInput(format!(
                    "renovation '{kind}' has invalid cost {cost}"
                )));
            }
            None => match rates.renovation_default_cost(&kind) {
                Some(default) => default,
                None => {
                    warnings.push(format!(
                        "Renovation '{kind}' has no cost and no default estimate; counted as 0."
                    ));
                    0.0
                }
            },
        };
        *breakdown.entry(format!("renovation_{kind}")).or_insert(0.0) += cost;
        total += cost;
    }
    if !input.renovations.is_empty() {
        breakdown.insert("renovation_total".into(), total);
    }
    Ok(total)
}

pub fn calculate_purchase_costs(
    input: &ScenarioInput,
    regime: PurchaseRegime,
    rates: &CountryRates,
    warnings: &mut Warnings,
) -> CalcResult<PurchaseCosts> {
    let price = require_price(input)?;
    let phasing = phase_price(input, regime, price, warnings)?;

    let mut breakdown = BTreeMap::new();
    breakdown.insert("property_price".to_string(), price);

    let loan_amount = input.loan_details.as_ref().and_then(|loan| loan.amount);
    let taxes = regime.transfer_taxes(price, rates, &mut breakdown, warnings);
    let fees = regime.fees(price, loan_amount, rates, &mut breakdown);
    let renovations = renovation_costs(input, rates, &mut breakdown, warnings)?;

    let taxes_fees = taxes + fees;
    breakdown.insert("taxes_fees_year0".into(), taxes_fees);

    let initial_outlay_year0 = price * phasing.year0_fraction;
    breakdown.insert("initial_property_payment_year0".into(), initial_outlay_year0);

    let upfront_fees_year0 = taxes_fees + renovations;
    let remaining_payments_value = price - initial_outlay_year0;
    if regime.is_under_construction() {
        breakdown.insert("remaining_payments_value".into(), remaining_payments_value);
    }

    Ok(PurchaseCosts {
        breakdown,
        total_purchase_costs: price + taxes_fees + renovations,
        initial_outlay_year0,
        upfront_fees_year0,
        cash_at_signing: initial_outlay_year0 + upfront_fees_year0,
        remaining_payments_value,
        installments: phasing.installments,
    })
}
