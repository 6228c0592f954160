use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};

/// default number of cached (principal, rate, months) results
pub const DEFAULT_CACHE_SIZE: usize = 128;

type CacheKey = (Money, Rate, u32);

/// level-payment calculator with an exact-key result cache
#[derive(Debug)]
pub struct AmortizationCalculator {
    cache: Mutex<HashMap<CacheKey, Money>>,
    capacity: usize,
}

impl AmortizationCalculator {
    pub fn new() -> Self {
        Self::with_cache_size(DEFAULT_CACHE_SIZE)
    }

    /// calculator that keeps up to `capacity` results; 0 disables caching
    pub fn with_cache_size(capacity: usize) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// calculator without a cache
    pub fn uncached() -> Self {
        Self::with_cache_size(0)
    }

    /// fixed monthly payment that amortizes `principal` to zero over `remaining_months`
    pub fn monthly_payment(&self, principal: Money, annual_rate: Rate, remaining_months: u32) -> Money {
        if remaining_months == 0 {
            return Money::ZERO;
        }
        if self.capacity == 0 {
            return level_payment(principal, annual_rate, remaining_months);
        }

        let key = (principal, annual_rate, remaining_months);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(payment) = cache.get(&key) {
            return *payment;
        }

        let payment = level_payment(principal, annual_rate, remaining_months);
        if cache.len() >= self.capacity {
            cache.clear();
        }
        cache.insert(key, payment);
        payment
    }

    /// number of cached results
    pub fn cached_entries(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for AmortizationCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// level payment without caching.
///
/// zero rate: `principal / months`, unrounded.
/// otherwise `P * r * (1 + r)^n / ((1 + r)^n - 1)` with `r = annual / 12`,
/// rounded half-up to minor units.
pub fn level_payment(principal: Money, annual_rate: Rate, months: u32) -> Money {
    if months == 0 {
        return Money::ZERO;
    }

    let monthly_rate = annual_rate.monthly_rate().as_decimal();

    if monthly_rate.is_zero() {
        return principal / Decimal::from(months);
    }

    let mut compound = Decimal::ONE;
    let base = Decimal::ONE + monthly_rate;
    for _ in 0..months {
        compound *= base;
    }

    let numerator = principal.as_decimal() * monthly_rate * compound;
    let denominator = compound - Decimal::ONE;

    Money::from_decimal(numerator / denominator).round_minor()
}
