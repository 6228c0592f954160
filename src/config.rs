use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{DuplicatePolicy, Identity, OverflowPolicy};

/// latest payment day accepted, so every month has it
pub const MAX_PAYMENT_DAY: u8 = 28;

/// loan parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanParameters {
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub payment_day: u8,
}

impl LoanParameters {
    /// create validated parameters
    pub fn new(
        principal: Money,
        annual_rate: Rate,
        term_months: u32,
        payment_day: u8,
        max_term_months: u32,
    ) -> Result<Self> {
        let parameters = Self {
            principal,
            annual_rate,
            term_months,
            payment_day,
        };
        parameters.validate(max_term_months)?;
        Ok(parameters)
    }

    /// check invariants
    pub fn validate(&self, max_term_months: u32) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LedgerError::invalid_parameter(
                "principal",
                format!("must be positive, got {}", self.principal),
            ));
        }
        if self.annual_rate.is_negative() {
            return Err(LedgerError::invalid_parameter(
                "annual_rate",
                format!("must not be negative, got {}", self.annual_rate),
            ));
        }
        if self.term_months == 0 || self.term_months > max_term_months {
            return Err(LedgerError::invalid_parameter(
                "term_months",
                format!("must be between 1 and {}, got {}", max_term_months, self.term_months),
            ));
        }
        if self.payment_day == 0 || self.payment_day > MAX_PAYMENT_DAY {
            return Err(LedgerError::invalid_parameter(
                "payment_day",
                format!("must be between 1 and {}, got {}", MAX_PAYMENT_DAY, self.payment_day),
            ));
        }
        Ok(())
    }

    /// check that a month index falls inside the term
    pub fn check_month(&self, month: u32) -> Result<()> {
        if month == 0 || month > self.term_months {
            return Err(LedgerError::invalid_parameter(
                "month",
                format!("must be between 1 and {}, got {}", self.term_months, month),
            ));
        }
        Ok(())
    }
}

impl Default for LoanParameters {
    fn default() -> Self {
        Self {
            principal: Money::from_major(1_500_000),
            annual_rate: Rate::from_percentage(10),
            term_months: 12,
            payment_day: 8,
        }
    }
}

/// editable loan parameter, as exposed to the admin command layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterField {
    Principal,
    AnnualRate,
    TermMonths,
    PaymentDay,
}

impl ParameterField {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterField::Principal => "principal",
            ParameterField::AnnualRate => "annual_rate",
            ParameterField::TermMonths => "term_months",
            ParameterField::PaymentDay => "payment_day",
        }
    }

    /// apply textual input to a copy of the parameters; the caller validates the result
    pub fn apply(&self, parameters: &LoanParameters, input: &str) -> Result<LoanParameters> {
        let mut updated = parameters.clone();
        match self {
            ParameterField::Principal => {
                updated.principal = Money::parse_input(input)
                    .ok_or_else(|| not_numeric(self.name(), input))?;
            }
            ParameterField::AnnualRate => {
                updated.annual_rate = Rate::from_percent(parse_decimal(self.name(), input)?);
            }
            ParameterField::TermMonths => {
                updated.term_months = parse_number(self.name(), input)?;
            }
            ParameterField::PaymentDay => {
                updated.payment_day = parse_number(self.name(), input)?;
            }
        }
        Ok(updated)
    }
}

/// work queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            overflow: OverflowPolicy::Reject,
        }
    }
}

/// logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing-subscriber filter directive, e.g. "info" or "loan_approval_rs=debug"
    pub level: String,
    /// append to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// identity allowed to run administrative operations
    pub admin: Identity,
    /// parameters used when the store holds none yet
    pub default_parameters: LoanParameters,
    pub minimum_payment: Money,
    pub max_term_months: u32,
    pub duplicate_policy: DuplicatePolicy,
    pub amortization_cache_size: usize,
    pub queue: QueueConfig,
    pub logging: LoggingConfig,
    pub store_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            admin: Identity::from("1175871225"),
            default_parameters: LoanParameters::default(),
            minimum_payment: Money::from_major(30_000),
            max_term_months: 360,
            duplicate_policy: DuplicatePolicy::Replace,
            amortization_cache_size: 128,
            queue: QueueConfig::default(),
            logging: LoggingConfig::default(),
            store_path: None,
        }
    }
}

impl ServiceConfig {
    /// load from process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// load from any key lookup, falling back to defaults for missing keys
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(admin) = lookup("ADMIN_ID") {
            config.admin = Identity::new(admin);
        }
        if let Some(amount) = lookup("DEFAULT_CREDIT_AMOUNT") {
            config.default_parameters.principal = Money::parse_input(&amount)
                .ok_or_else(|| not_numeric("DEFAULT_CREDIT_AMOUNT", &amount))?;
        }
        if let Some(rate) = lookup("DEFAULT_INTEREST_RATE") {
            config.default_parameters.annual_rate =
                Rate::from_percent(parse_decimal("DEFAULT_INTEREST_RATE", &rate)?);
        }
        if let Some(term) = lookup("DEFAULT_TERM_MONTHS") {
            config.default_parameters.term_months = parse_number("DEFAULT_TERM_MONTHS", &term)?;
        }
        if let Some(day) = lookup("DEFAULT_PAYMENT_DAY") {
            config.default_parameters.payment_day = parse_number("DEFAULT_PAYMENT_DAY", &day)?;
        }
        if let Some(minimum) = lookup("MIN_PAYMENT") {
            config.minimum_payment = Money::parse_input(&minimum)
                .ok_or_else(|| not_numeric("MIN_PAYMENT", &minimum))?;
        }
        if let Some(max_term) = lookup("MAX_TERM_MONTHS") {
            config.max_term_months = parse_number("MAX_TERM_MONTHS", &max_term)?;
        }
        if let Some(capacity) = lookup("QUEUE_CAPACITY") {
            config.queue.capacity = parse_number("QUEUE_CAPACITY", &capacity)?;
        }
        if let Some(overflow) = lookup("QUEUE_OVERFLOW") {
            config.queue.overflow = match overflow.trim().to_ascii_lowercase().as_str() {
                "reject" => OverflowPolicy::Reject,
                "block" => OverflowPolicy::Block,
                other => {
                    return Err(LedgerError::invalid_parameter(
                        "QUEUE_OVERFLOW",
                        format!("expected reject or block, got {}", other),
                    ))
                }
            };
        }
        if let Some(policy) = lookup("DUPLICATE_POLICY") {
            config.duplicate_policy = match policy.trim().to_ascii_lowercase().as_str() {
                "replace" => DuplicatePolicy::Replace,
                "reject" => DuplicatePolicy::Reject,
                other => {
                    return Err(LedgerError::invalid_parameter(
                        "DUPLICATE_POLICY",
                        format!("expected replace or reject, got {}", other),
                    ))
                }
            };
        }
        if let Some(size) = lookup("AMORTIZATION_CACHE_SIZE") {
            config.amortization_cache_size = parse_number("AMORTIZATION_CACHE_SIZE", &size)?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.logging.level = level.trim().to_string();
        }
        if let Some(file) = lookup("LOG_FILE") {
            config.logging.file = Some(PathBuf::from(file));
        }
        if let Some(path) = lookup("STORE_PATH") {
            config.store_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    /// load from a json document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_term_months == 0 {
            return Err(LedgerError::invalid_parameter("max_term_months", "must be positive"));
        }
        self.default_parameters.validate(self.max_term_months)?;
        if !self.minimum_payment.is_positive() {
            return Err(LedgerError::invalid_parameter("minimum_payment", "must be positive"));
        }
        if self.queue.capacity == 0 {
            return Err(LedgerError::invalid_parameter("queue.capacity", "must be at least 1"));
        }
        Ok(())
    }
}

fn not_numeric(name: &str, input: &str) -> LedgerError {
    LedgerError::invalid_parameter(name, format!("not a number: {:?}", input))
}

fn parse_decimal(name: &str, input: &str) -> Result<Decimal> {
    let cleaned = input.trim().replace(',', ".");
    Decimal::from_str(&cleaned).map_err(|_| not_numeric(name, input))
}

fn parse_number<T: FromStr>(name: &str, input: &str) -> Result<T> {
    input.trim().parse().map_err(|_| not_numeric(name, input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.default_parameters.principal, Money::from_major(1_500_000));
        assert_eq!(config.default_parameters.annual_rate, Rate::from_percentage(10));
        assert_eq!(config.default_parameters.term_months, 12);
        assert_eq!(config.default_parameters.payment_day, 8);
        assert_eq!(config.minimum_payment, Money::from_major(30_000));
        assert_eq!(config.queue.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn test_env_overrides() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("ADMIN_ID", "42"),
            ("DEFAULT_CREDIT_AMOUNT", "200000"),
            ("DEFAULT_INTEREST_RATE", "7,5"),
            ("DEFAULT_TERM_MONTHS", "24"),
            ("QUEUE_OVERFLOW", "block"),
            ("DUPLICATE_POLICY", "reject"),
        ]))
        .unwrap();

        assert_eq!(config.admin, Identity::from("42"));
        assert_eq!(config.default_parameters.principal, Money::from_major(200_000));
        assert_eq!(config.default_parameters.annual_rate.as_percentage(), dec!(7.5));
        assert_eq!(config.default_parameters.term_months, 24);
        assert_eq!(config.queue.overflow, OverflowPolicy::Block);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = ServiceConfig::from_lookup(lookup_from(&[("DEFAULT_TERM_MONTHS", "twelve")]));
        assert!(matches!(err, Err(LedgerError::InvalidParameter { .. })));

        let err = ServiceConfig::from_lookup(lookup_from(&[("DEFAULT_PAYMENT_DAY", "31")]));
        assert!(matches!(err, Err(LedgerError::InvalidParameter { .. })));

        let err = ServiceConfig::from_lookup(lookup_from(&[("QUEUE_CAPACITY", "0")]));
        assert!(matches!(err, Err(LedgerError::InvalidParameter { .. })));
    }

    #[test]
    fn test_json_round_trip() {
        let json = serde_json::to_string(&ServiceConfig::default()).unwrap();
        let config = ServiceConfig::from_json_str(&json).unwrap();
        assert_eq!(config.default_parameters, LoanParameters::default());
    }

    #[test]
    fn test_parameter_validation() {
        let ok = LoanParameters::new(Money::from_major(1000), Rate::ZERO, 12, 28, 360);
        assert!(ok.is_ok());

        let zero_principal = LoanParameters::new(Money::ZERO, Rate::ZERO, 12, 1, 360);
        assert!(zero_principal.is_err());

        let negative_rate =
            LoanParameters::new(Money::from_major(1), Rate::from_decimal(dec!(-0.01)), 12, 1, 360);
        assert!(negative_rate.is_err());

        let long_term = LoanParameters::new(Money::from_major(1), Rate::ZERO, 361, 1, 360);
        assert!(long_term.is_err());
    }

    #[test]
    fn test_parameter_field_apply() {
        let base = LoanParameters::default();

        let updated = ParameterField::AnnualRate.apply(&base, "12,5").unwrap();
        assert_eq!(updated.annual_rate.as_percentage(), dec!(12.5));

        let updated = ParameterField::Principal.apply(&base, "2 000 000").unwrap();
        assert_eq!(updated.principal, Money::from_major(2_000_000));

        assert!(ParameterField::TermMonths.apply(&base, "-3").is_err());
        assert!(ParameterField::PaymentDay.apply(&base, "x").is_err());
    }
}
