use serde::{Deserialize, Deserializer, Serialize};

use super::amortization::LoanCosts;
use super::growth::GrowthOutcome;
use super::purchase::PurchaseCosts;
use super::rates::AssumptionOverrides;
use super::renting::RentingScenarioResult;
use super::running::RunningCosts;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Country {
    #[serde(alias = "Spain", alias = "es")]
    Spain,
    #[serde(alias = "Denmark", alias = "dk")]
    Denmark,
}

impl Country {
    pub fn as_str(self) -> &'static str {
        match self {
            Country::Spain => "spain",
            Country::Denmark => "denmark",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Country::Spain => "Spain",
            Country::Denmark => "Denmark",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    New,
    #[serde(alias = "renovation_needed", alias = "resale", alias = "second-hand")]
    SecondHand,
    #[serde(alias = "under-construction")]
    UnderConstruction,
    Ejer,
    Andels,
}

impl PropertyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyType::New => "new",
            PropertyType::SecondHand => "second_hand",
            PropertyType::UnderConstruction => "under_construction",
            PropertyType::Ejer => "ejer",
            PropertyType::Andels => "andels",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PropertyType::New => "New build",
            PropertyType::SecondHand => "Second hand",
            PropertyType::UnderConstruction => "Under construction",
            PropertyType::Ejer => "Ejerlejlighed",
            PropertyType::Andels => "Andelslejlighed",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DanishLoanType {
    Realkredit,
    Bank,
    #[serde(alias = "andelslån", alias = "andelslan", alias = "andels_loan")]
    Andelslaan,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Renovation {
    #[serde(rename = "type", default = "default_renovation_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub adjusted_cost: Option<f64>,
}

fn default_renovation_kind() -> String {
    "custom".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PaymentScheduleEntry {
    pub percentage: f64,
    pub due_year: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoanDetails {
    pub amount: Option<f64>,
    #[serde(alias = "interest_rate")]
    pub annual_interest_rate: Option<f64>,
    pub term_years: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioInput {
    #[serde(default, alias = "scenario_id")]
    pub id: String,
    pub country: Country,
    #[serde(default)]
    pub city: Option<String>,
    pub property_type: PropertyType,
    #[serde(default, alias = "new_flat_price")]
    pub price: Option<f64>,
    #[serde(default)]
    pub renovations: Vec<Renovation>,
    #[serde(default)]
    pub loan_details: Option<LoanDetails>,
    #[serde(default)]
    pub beckham_law_active: bool,
    #[serde(default)]
    pub beckham_law_remaining_years: u32,
    #[serde(default)]
    pub danish_loan_type: Option<DanishLoanType>,
    #[serde(default)]
    pub primary_residence: bool,
    #[serde(default)]
    pub construction_completion_years: Option<u32>,
    #[serde(default)]
    pub payment_schedule: Option<Vec<PaymentScheduleEntry>>,
}

impl ScenarioInput {
    pub fn new(id: impl Into<String>, country: Country, property_type: PropertyType) -> Self {
        Self {
            id: id.into(),
            country,
            city: None,
            property_type,
            price: None,
            renovations: Vec::new(),
            loan_details: None,
            beckham_law_active: false,
            beckham_law_remaining_years: 0,
            danish_loan_type: None,
            primary_residence: false,
            construction_completion_years: None,
            payment_schedule: None,
        }
    }
}

/// One slot of the incoming batch. A scenario that does not match the
/// `ScenarioInput` shape is kept as `Malformed` so it can be reported in its
/// own slot instead of rejecting the whole request.
#[derive(Debug, Clone)]
pub enum ScenarioEntry {
    Valid(Box<ScenarioInput>),
    Malformed {
        scenario_id: Option<String>,
        error: String,
    },
}

impl ScenarioEntry {
    pub fn scenario_id(&self) -> Option<&str> {
        match self {
            ScenarioEntry::Valid(input) => Some(input.id.as_str()),
            ScenarioEntry::Malformed { scenario_id, .. } => scenario_id.as_deref(),
        }
    }
}

impl From<ScenarioInput> for ScenarioEntry {
    fn from(input: ScenarioInput) -> Self {
        ScenarioEntry::Valid(Box::new(input))
    }
}

impl<'de> Deserialize<'de> for ScenarioEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match ScenarioInput::deserialize(&value) {
            Ok(input) => Ok(ScenarioEntry::Valid(Box::new(input))),
            Err(err) => {
                let scenario_id = value
                    .get("id")
                    .or_else(|| value.get("scenario_id"))
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned);
                Ok(ScenarioEntry::Malformed {
                    scenario_id,
                    error: err.to_string(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioSettings {
    #[serde(default = "default_years_to_sell")]
    pub years_to_sell: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_years_to_sell() -> i64 {
    10
}

fn default_currency() -> String {
    "EUR".to_string()
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            years_to_sell: default_years_to_sell(),
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonalFinanceInputs {
    pub salary: Option<f64>,
    pub tax_rate_override: Option<f64>,
    pub existing_property_value: Option<f64>,
    pub existing_property_loan: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RentingScenarioInputs {
    pub monthly_rent: Option<f64>,
    pub monthly_water: Option<f64>,
    pub monthly_utilities: Option<f64>,
    pub monthly_parking: Option<f64>,
    pub rent_increment: Option<f64>,
    pub water_increment: Option<f64>,
    pub utilities_increment: Option<f64>,
    pub parking_increment: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub personal_finance: Option<PersonalFinanceInputs>,
    #[serde(default)]
    pub scenario_settings: ScenarioSettings,
    pub scenarios: Vec<ScenarioEntry>,
    #[serde(default)]
    pub renting_scenario_inputs: Option<RentingScenarioInputs>,
    #[serde(default)]
    pub assumptions: Option<AssumptionOverrides>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthProfile {
    ZeroGrowth,
    #[serde(alias = "avg")]
    Average,
    LowRisk,
    HighRisk,
}

impl GrowthProfile {
    pub const ALL: [GrowthProfile; 4] = [
        GrowthProfile::ZeroGrowth,
        GrowthProfile::Average,
        GrowthProfile::LowRisk,
        GrowthProfile::HighRisk,
    ];
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub label: String,
    pub country: Country,
    pub property_type: PropertyType,
    pub currency: String,
    pub years_to_sell: u32,
    pub purchase_costs: PurchaseCosts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_costs: Option<LoanCosts>,
    pub running_costs: RunningCosts,
    pub growth_scenarios: std::collections::BTreeMap<GrowthProfile, GrowthOutcome>,
    pub warnings: Vec<String>,
}

impl ScenarioResult {
    pub fn total_loan_interest(&self) -> f64 {
        self.loan_costs
            .as_ref()
            .map_or(0.0, |loan| loan.total_interest_paid)
    }

    pub fn outcome(&self, profile: GrowthProfile) -> Option<&GrowthOutcome> {
        self.growth_scenarios.get(&profile)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Result(Box<ScenarioResult>),
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub scenario_id: String,
    #[serde(flatten)]
    pub status: ScenarioStatus,
}

impl ScenarioOutcome {
    pub fn result(&self) -> Option<&ScenarioResult> {
        match &self.status {
            ScenarioStatus::Result(result) => Some(result),
            ScenarioStatus::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ScenarioStatus::Result(_) => None,
            ScenarioStatus::Error(msg) => Some(msg),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub scenarios: Vec<ScenarioOutcome>,
    pub global_warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renting_scenario: Option<RentingScenarioResult>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Warnings(Vec<String>);

impl Warnings {
    pub fn push(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.0.contains(&warning) {
            self.0.push(warning);
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.0.iter().any(|w| w.contains(needle))
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}
