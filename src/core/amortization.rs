use std::iter::FusedIterator;

use serde::Serialize;

use super::error::{CalcError, CalcResult};
use super::purchase::PurchaseRegime;
use super::rates::{CountryRates, DisbursementPolicy};
use super::types::{Country, DanishLoanType, ScenarioInput, Warnings};

const MAX_TERM_YEARS: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loan {
    principal: f64,
    annual_rate: f64,
    term_years: u32,
    monthly_rate: f64,
    months: u32,
    monthly_payment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaymentRow {
    pub number: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal: f64,
    pub remaining_balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldingSummary {
    pub months_paid: u32,
    pub interest_paid: f64,
    pub principal_repaid: f64,
    pub remaining_balance: f64,
}

impl Loan {
    pub fn new(principal: f64, annual_rate: f64, term_years: i64) -> CalcResult<Self> {
        let valid = principal.is_finite()
            && principal > 0.0
            && annual_rate.is_finite()
            && annual_rate > 0.0
            && (1..=MAX_TERM_YEARS).contains(&term_years);
        if !valid {
            return Err(CalcError::InvalidLoanParameters);
        }
        let term_years = term_years as u32;

        let monthly_rate = annual_rate / 12.0;
        let months = term_years * 12;
        let growth = (1.0 + monthly_rate).powi(months as i32);
        let monthly_payment = principal * monthly_rate * growth / (growth - 1.0);
        if !monthly_payment.is_finite() {
            return Err(CalcError::InvalidLoanParameters);
        }

        Ok(Self {
            principal,
            annual_rate,
            term_years,
            monthly_rate,
            months,
            monthly_payment,
        })
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn annual_rate(&self) -> f64 {
        self.annual_rate
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    pub fn monthly_payment(&self) -> f64 {
        self.monthly_payment
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            loan: *self,
            next_number: 1,
            balance: self.principal,
        }
    }

    pub fn summary_over_months(&self, months: u32) -> HoldingSummary {
        let months_paid = months.min(self.months);
        let mut summary = HoldingSummary {
            months_paid,
            interest_paid: 0.0,
            principal_repaid: 0.0,
            remaining_balance: self.principal,
        };
        for row in self.schedule().take(months_paid as usize) {
            summary.interest_paid += row.interest;
            summary.principal_repaid += row.principal;
            summary.remaining_balance = row.remaining_balance;
        }
        summary
    }

    pub fn interest_over_months(&self, months: u32) -> f64 {
        self.summary_over_months(months).interest_paid
    }

    pub fn interest_over_years(&self, years: u32) -> f64 {
        self.interest_over_months(years.saturating_mul(12))
    }
}

#[derive(Debug, Clone)]
pub struct Schedule {
    loan: Loan,
    next_number: u32,
    balance: f64,
}

impl Iterator for Schedule {
    type Item = PaymentRow;

    fn next(&mut self) -> Option<PaymentRow> {
        if self.next_number > self.loan.months {
            return None;
        }
        let number = self.next_number;
        self.next_number += 1;

        let interest = self.balance * self.loan.monthly_rate;
        let (payment, principal, remaining_balance) = if number == self.loan.months {
            // Last row settles whatever rounding drift is left.
            let principal = self.balance;
            (interest + principal, principal, 0.0)
        } else {
            let principal = self.loan.monthly_payment - interest;
            (
                self.loan.monthly_payment,
                principal,
                (self.balance - principal).max(0.0),
            )
        };
        self.balance = remaining_balance;

        Some(PaymentRow {
            number,
            payment,
            interest,
            principal,
            remaining_balance,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.loan.months + 1).saturating_sub(self.next_number) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Schedule {}

impl FusedIterator for Schedule {}

#[derive(Debug, Clone, Serialize)]
pub struct LoanCosts {
    pub loan_amount: f64,
    pub annual_interest_rate: f64,
    pub term_years: u32,
    pub monthly_payment: f64,
    pub months_paid: u32,
    pub interest_free_months: u32,
    pub total_interest_paid: f64,
    pub principal_repaid: f64,
    pub remaining_balance: f64,
}

/// Financing cost over the holding period. `Ok(None)` means the scenario has no
/// usable loan and carries no interest.
pub fn resolve_loan_costs(
    input: &ScenarioInput,
    regime: PurchaseRegime,
    rates: &CountryRates,
    years_to_sell: u32,
    policy: DisbursementPolicy,
    warnings: &mut Warnings,
) -> CalcResult<Option<LoanCosts>> {
    if input.danish_loan_type == Some(DanishLoanType::Andelslaan) && !regime.is_andels() {
        warnings.push("Andelslån selected for a property that is not an andelslejlighed.");
    }

    let Some(details) = &input.loan_details else {
        return Ok(None);
    };

    let annual_rate = match (details.annual_interest_rate, input.danish_loan_type) {
        (Some(rate), _) => Some(rate),
        (None, Some(loan_type)) if regime.country() == Country::Denmark => {
            let rate = rates.danish_loan_rate(loan_type);
            warnings.push(format!(
                "Loan interest rate not given; assumed {:.2}% for the selected Danish loan type.",
                rate * 100.0
            ));
            Some(rate)
        }
        (None, _) => None,
    };

    let (Some(amount), Some(annual_rate), Some(term_years)) =
        (details.amount, annual_rate, details.term_years)
    else {
        warnings.push(
            "Loan details incomplete (amount, interest rate and term are all required); loan interest treated as zero.",
        );
        return Ok(None);
    };

    let loan = Loan::new(amount, annual_rate, term_years)?;

    let hold_months = years_to_sell.saturating_mul(12);
    let interest_free_months = match policy {
        DisbursementPolicy::AtCompletion if regime.is_under_construction() => input
            .construction_completion_years
            .unwrap_or(0)
            .saturating_mul(12)
            .min(hold_months),
        _ => 0,
    };
    if interest_free_months > 0 {
        warnings.push(
            "Loan assumed to be disbursed at completion; no interest accrues during construction.",
        );
    }

    let summary = loan.summary_over_months(hold_months - interest_free_months);
    Ok(Some(LoanCosts {
        loan_amount: loan.principal(),
        annual_interest_rate: loan.annual_rate(),
        term_years: loan.term_years(),
        monthly_payment: loan.monthly_payment(),
        months_paid: summary.months_paid,
        interest_free_months,
        total_interest_paid: summary.interest_paid,
        principal_repaid: summary.principal_repaid,
        remaining_balance: summary.remaining_balance,
    }))
}
