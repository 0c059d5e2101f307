use thiserror::Error;

pub type CalcResult<T> = std::result::Result<T, CalcError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error(
        "invalid loan parameters: amount and annual interest rate must be > 0 and the term between 1 and 100 years"
    )]
    InvalidLoanParameters,

    #[error("missing required input: {0}")]
    MissingRequiredInput(&'static str),

    #[error("holding period must be between 1 and 100 years")]
    InvalidHoldingPeriod,

    #[error("payment schedule percentages must sum to 1.0 (got {sum:.4})")]
    InvalidPaymentSchedule { sum: f64 },

    #[error("property type '{property_type}' is not available in {country}")]
    UnsupportedPropertyType {
        country: &'static str,
        property_type: &'static str,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("calculation produced a non-finite value for {0}")]
    NonFiniteResult(&'static str),

    #[error("malformed batch request: {0}")]
    MalformedRequest(String),

    #[error("internal calculation failure: {0}")]
    Internal(String),
}
