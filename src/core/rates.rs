use serde::{Deserialize, Serialize};

use super::types::{Country, DanishLoanType, Warnings};

pub const DEFAULT_UNDER_CONSTRUCTION_DOWN_PAYMENT: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct TaxBracket {
    pub limit: f64,
    pub rate: f64,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisbursementPolicy {
    #[default]
    AtSigning,
    AtCompletion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRates {
    pub reference_city: &'static str,

    pub vat_rate: f64,
    pub ajd_rate: f64,
    pub itp_rate: f64,
    pub notary_fee_rate: f64,
    pub registry_fee_rate: f64,
    pub lawyer_fee_rate: f64,
    pub lawyer_fee_flat: f64,
    pub tinglysning_fixed: f64,
    pub tinglysning_rate: f64,
    pub loan_registration_fixed: f64,
    pub loan_registration_rate: f64,
    pub kitchen_renovation_cost: f64,
    pub bathroom_renovation_cost: f64,

    pub property_tax_rate: f64,
    pub property_tax_base_share: f64,
    pub property_value_tax_rate: f64,
    pub community_fee_monthly: f64,
    pub property_tax_escalation: f64,
    pub community_fee_escalation: f64,

    pub selling_agency_fee_rate: f64,
    pub plusvalia_placeholder: f64,
    pub capital_gains_brackets: Vec<TaxBracket>,
    pub capital_gains_flat_rate: f64,
    pub beckham_law_rate: f64,

    pub avg_appreciation_rate: f64,
    pub appreciation_std_dev: f64,

    pub realkredit_interest_rate: f64,
    pub bank_loan_interest_rate: f64,
    pub andelslaan_interest_rate: f64,
}

impl CountryRates {
    pub fn spain() -> Self {
        Self {
            reference_city: "barcelona",
            vat_rate: 0.10,
            ajd_rate: 0.015,
            itp_rate: 0.10,
            notary_fee_rate: 0.005,
            registry_fee_rate: 0.004,
            lawyer_fee_rate: 0.01,
            lawyer_fee_flat: 0.0,
            tinglysning_fixed: 0.0,
            tinglysning_rate: 0.0,
            loan_registration_fixed: 0.0,
            loan_registration_rate: 0.0,
            kitchen_renovation_cost: 15_000.0,
            bathroom_renovation_cost: 8_000.0,
            property_tax_rate: 0.007,
            property_tax_base_share: 0.5,
            property_value_tax_rate: 0.0,
            community_fee_monthly: 100.0,
            property_tax_escalation: 0.0,
            community_fee_escalation: 0.0,
            selling_agency_fee_rate: 0.05,
            plusvalia_placeholder: 1_500.0,
            capital_gains_brackets: vec![
                TaxBracket {
                    limit: 6_000.0,
                    rate: 0.19,
                },
                TaxBracket {
                    limit: 50_000.0,
                    rate: 0.21,
                },
                TaxBracket {
                    limit: 200_000.0,
                    rate: 0.23,
                },
                TaxBracket {
                    limit: f64::INFINITY,
                    rate: 0.26,
                },
            ],
            capital_gains_flat_rate: 0.0,
            beckham_law_rate: 0.24,
            avg_appreciation_rate: 0.03,
            appreciation_std_dev: 0.05,
            realkredit_interest_rate: 0.0,
            bank_loan_interest_rate: 0.0,
            andelslaan_interest_rate: 0.0,
        }
    }

    pub fn denmark() -> Self {
        Self {
            reference_city: "copenhagen",
            vat_rate: 0.0,
            ajd_rate: 0.0,
            itp_rate: 0.0,
            notary_fee_rate: 0.0,
            registry_fee_rate: 0.0,
            lawyer_fee_rate: 0.0,
            lawyer_fee_flat: 15_000.0,
            tinglysning_fixed: 1_850.0,
            tinglysning_rate: 0.006,
            loan_registration_fixed: 1_825.0,
            loan_registration_rate: 0.0145,
            kitchen_renovation_cost: 100_000.0,
            bathroom_renovation_cost: 60_000.0,
            property_tax_rate: 0.0092,
            property_tax_base_share: 0.3,
            property_value_tax_rate: 0.0051,
            community_fee_monthly: 1_500.0,
            property_tax_escalation: 0.0,
            community_fee_escalation: 0.0,
            selling_agency_fee_rate: 0.02,
            plusvalia_placeholder: 0.0,
            capital_gains_brackets: Vec::new(),
            capital_gains_flat_rate: 0.42,
            beckham_law_rate: 0.0,
            avg_appreciation_rate: 0.04,
            appreciation_std_dev: 0.06,
            realkredit_interest_rate: 0.04,
            bank_loan_interest_rate: 0.05,
            andelslaan_interest_rate: 0.055,
        }
    }

    pub fn for_country(country: Country) -> Self {
        match country {
            Country::Spain => Self::spain(),
            Country::Denmark => Self::denmark(),
        }
    }

    pub fn danish_loan_rate(&self, loan_type: DanishLoanType) -> f64 {
        match loan_type {
            DanishLoanType::Realkredit => self.realkredit_interest_rate,
            DanishLoanType::Bank => self.bank_loan_interest_rate,
            DanishLoanType::Andelslaan => self.andelslaan_interest_rate,
        }
    }

    pub fn renovation_default_cost(&self, kind: &str) -> Option<f64> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "kitchen" => Some(self.kitchen_renovation_cost),
            "bathroom" => Some(self.bathroom_renovation_cost),
            _ => None,
        }
    }

    pub fn is_reference_city(&self, city: &str) -> bool {
        city.trim().eq_ignore_ascii_case(self.reference_city)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RateOverrides {
    pub vat_rate: Option<f64>,
    pub ajd_rate: Option<f64>,
    pub itp_rate: Option<f64>,
    pub notary_fee_rate: Option<f64>,
    pub registry_fee_rate: Option<f64>,
    pub lawyer_fee_rate: Option<f64>,
    pub lawyer_fee_flat: Option<f64>,
    pub tinglysning_fixed: Option<f64>,
    pub tinglysning_rate: Option<f64>,
    pub property_tax_rate: Option<f64>,
    pub property_value_tax_rate: Option<f64>,
    pub community_fee_monthly: Option<f64>,
    pub property_tax_escalation: Option<f64>,
    pub community_fee_escalation: Option<f64>,
    pub selling_agency_fee_rate: Option<f64>,
    pub plusvalia_placeholder: Option<f64>,
    pub capital_gains_flat_rate: Option<f64>,
    pub beckham_law_rate: Option<f64>,
    pub avg_appreciation_rate: Option<f64>,
    pub appreciation_std_dev: Option<f64>,
    pub realkredit_interest_rate: Option<f64>,
    pub bank_loan_interest_rate: Option<f64>,
    pub andelslaan_interest_rate: Option<f64>,
}

#[derive(Copy, Clone)]
enum Bound {
    Fraction,
    Amount,
    Escalation,
}

fn apply_override(
    target: &mut f64,
    value: Option<f64>,
    name: &str,
    country: Country,
    bound: Bound,
    warnings: &mut Warnings,
) {
    let Some(v) = value else {
        return;
    };
    let valid = v.is_finite()
        && match bound {
            Bound::Fraction => (0.0..=1.0).contains(&v),
            Bound::Amount => v >= 0.0,
            Bound::Escalation => v > -1.0 && v <= 1.0,
        };
    if valid {
        *target = v;
    } else {
        warnings.push(format!(
            "Ignored {} assumption override '{name}' = {v}: value out of range.",
            country.as_str()
        ));
    }
}

impl RateOverrides {
    pub fn apply_to(&self, rates: &mut CountryRates, country: Country, warnings: &mut Warnings) {
        use Bound::{Amount, Escalation, Fraction};

        let mut set = |target: &mut f64, value: Option<f64>, name: &str, bound: Bound| {
            apply_override(target, value, name, country, bound, warnings)
        };

        set(&mut rates.vat_rate, self.vat_rate, "vat_rate", Fraction);
        set(&mut rates.ajd_rate, self.ajd_rate, "ajd_rate", Fraction);
        set(&mut rates.itp_rate, self.itp_rate, "itp_rate", Fraction);
        set(
            &mut rates.notary_fee_rate,
            self.notary_fee_rate,
            "notary_fee_rate",
            Fraction,
        );
        set(
            &mut rates.registry_fee_rate,
            self.registry_fee_rate,
            "registry_fee_rate",
            Fraction,
        );
        set(
            &mut rates.lawyer_fee_rate,
            self.lawyer_fee_rate,
            "lawyer_fee_rate",
            Fraction,
        );
        set(
            &mut rates.lawyer_fee_flat,
            self.lawyer_fee_flat,
            "lawyer_fee_flat",
            Amount,
        );
        set(
            &mut rates.tinglysning_fixed,
            self.tinglysning_fixed,
            "tinglysning_fixed",
            Amount,
        );
        set(
            &mut rates.tinglysning_rate,
            self.tinglysning_rate,
            "tinglysning_rate",
            Fraction,
        );
        set(
            &mut rates.property_tax_rate,
            self.property_tax_rate,
            "property_tax_rate",
            Fraction,
        );
        set(
            &mut rates.property_value_tax_rate,
            self.property_value_tax_rate,
            "property_value_tax_rate",
            Fraction,
        );
        set(
            &mut rates.community_fee_monthly,
            self.community_fee_monthly,
            "community_fee_monthly",
            Amount,
        );
        set(
            &mut rates.property_tax_escalation,
            self.property_tax_escalation,
            "property_tax_escalation",
            Escalation,
        );
        set(
            &mut rates.community_fee_escalation,
            self.community_fee_escalation,
            "community_fee_escalation",
            Escalation,
        );
        set(
            &mut rates.selling_agency_fee_rate,
            self.selling_agency_fee_rate,
            "selling_agency_fee_rate",
            Fraction,
        );
        set(
            &mut rates.plusvalia_placeholder,
            self.plusvalia_placeholder,
            "plusvalia_placeholder",
            Amount,
        );
        set(
            &mut rates.capital_gains_flat_rate,
            self.capital_gains_flat_rate,
            "capital_gains_flat_rate",
            Fraction,
        );
        set(
            &mut rates.beckham_law_rate,
            self.beckham_law_rate,
            "beckham_law_rate",
            Fraction,
        );
        set(
            &mut rates.avg_appreciation_rate,
            self.avg_appreciation_rate,
            "avg_appreciation_rate",
            Escalation,
        );
        set(
            &mut rates.appreciation_std_dev,
            self.appreciation_std_dev,
            "appreciation_std_dev",
            Fraction,
        );
        set(
            &mut rates.realkredit_interest_rate,
            self.realkredit_interest_rate,
            "realkredit_interest_rate",
            Fraction,
        );
        set(
            &mut rates.bank_loan_interest_rate,
            self.bank_loan_interest_rate,
            "bank_loan_interest_rate",
            Fraction,
        );
        set(
            &mut rates.andelslaan_interest_rate,
            self.andelslaan_interest_rate,
            "andelslaan_interest_rate",
            Fraction,
        );
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AssumptionOverrides {
    pub spain: Option<RateOverrides>,
    pub denmark: Option<RateOverrides>,
    pub disbursement_policy: Option<DisbursementPolicy>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assumptions {
    pub spain: CountryRates,
    pub denmark: CountryRates,
    pub disbursement_policy: DisbursementPolicy,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            spain: CountryRates::spain(),
            denmark: CountryRates::denmark(),
            disbursement_policy: DisbursementPolicy::default(),
        }
    }
}

impl Assumptions {
    pub fn resolve(overrides: Option<&AssumptionOverrides>, warnings: &mut Warnings) -> Self {
        let mut assumptions = Self::default();
        let Some(overrides) = overrides else {
            return assumptions;
        };

        if let Some(spain) = &overrides.spain {
            spain.apply_to(&mut assumptions.spain, Country::Spain, warnings);
        }
        if let Some(denmark) = &overrides.denmark {
            denmark.apply_to(&mut assumptions.denmark, Country::Denmark, warnings);
        }
        if let Some(policy) = overrides.disbursement_policy {
            assumptions.disbursement_policy = policy;
        }
        assumptions
    }

    pub fn rates_for(&self, country: Country) -> &CountryRates {
        match country {
            Country::Spain => &self.spain,
            Country::Denmark => &self.denmark,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_without_overrides_uses_country_defaults() {
        let mut warnings = Warnings::default();
        let assumptions = Assumptions::resolve(None, &mut warnings);
        assert_eq!(assumptions.spain, CountryRates::spain());
        assert_eq!(assumptions.denmark, CountryRates::denmark());
        assert_eq!(assumptions.disbursement_policy, DisbursementPolicy::AtSigning);
        assert!(warnings.as_slice().is_empty());
    }

    #[test]
    fn overrides_replace_only_supplied_fields() {
        let overrides = AssumptionOverrides {
            spain: Some(RateOverrides {
                avg_appreciation_rate: Some(0.05),
                community_fee_monthly: Some(250.0),
                ..RateOverrides::default()
            }),
            denmark: None,
            disbursement_policy: Some(DisbursementPolicy::AtCompletion),
        };
        let mut warnings = Warnings::default();
        let assumptions = Assumptions::resolve(Some(&overrides), &mut warnings);

        assert_eq!(assumptions.spain.avg_appreciation_rate, 0.05);
        assert_eq!(assumptions.spain.community_fee_monthly, 250.0);
        assert_eq!(assumptions.spain.vat_rate, CountryRates::spain().vat_rate);
        assert_eq!(assumptions.denmark, CountryRates::denmark());
        assert_eq!(
            assumptions.disbursement_policy,
            DisbursementPolicy::AtCompletion
        );
        assert!(warnings.as_slice().is_empty());
    }

    #[test]
    fn out_of_range_override_is_ignored_with_warning() {
        let overrides = AssumptionOverrides {
            denmark: Some(RateOverrides {
                selling_agency_fee_rate: Some(1.5),
                community_fee_monthly: Some(-10.0),
                ..RateOverrides::default()
            }),
            ..AssumptionOverrides::default()
        };
        let mut warnings = Warnings::default();
        let assumptions = Assumptions::resolve(Some(&overrides), &mut warnings);

        assert_eq!(assumptions.denmark, CountryRates::denmark());
        assert!(warnings.contains("selling_agency_fee_rate"));
        assert!(warnings.contains("community_fee_monthly"));
    }

    #[test]
    fn renovation_defaults_are_case_insensitive() {
        let rates = CountryRates::denmark();
        assert_eq!(rates.renovation_default_cost("Kitchen"), Some(100_000.0));
        assert_eq!(rates.renovation_default_cost(" bathroom "), Some(60_000.0));
        assert_eq!(rates.renovation_default_cost("roof"), None);
    }
}
