mod amortization;
mod engine;
mod error;
mod growth;
mod purchase;
mod rates;
mod renting;
mod running;
mod selling;
mod types;

pub use amortization::{HoldingSummary, Loan, LoanCosts, PaymentRow, Schedule};
pub use engine::{MAX_HOLDING_YEARS, compute, compute_json, holding_years, parse_request};
pub use error::{CalcError, CalcResult};
pub use growth::{GrowthOutcome, HoldingCosts, project_selling_price};
pub use purchase::{InstallmentDue, PurchaseCosts, PurchaseRegime, validate_payment_schedule};
pub use rates::{
    AssumptionOverrides, Assumptions, CountryRates, DisbursementPolicy, RateOverrides, TaxBracket,
};
pub use renting::{RentingScenarioResult, RentingYear, compute_renting_baseline};
pub use running::{RunningCostCategory, RunningCosts};
pub use selling::{CapitalGainsRule, SellingCosts, progressive_tax};
pub use types::{
    BatchRequest, BatchResult, Country, DanishLoanType, GrowthProfile, LoanDetails,
    PaymentScheduleEntry, PersonalFinanceInputs, PropertyType, Renovation, RentingScenarioInputs,
    ScenarioEntry, ScenarioInput, ScenarioOutcome, ScenarioResult, ScenarioSettings,
    ScenarioStatus, Warnings,
};
