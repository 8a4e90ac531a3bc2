use crate::domain::{ContributionResult, JurisdictionStandard};
use crate::utils::error::{CalcError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Money values are reported to the cent.
pub const MONEY_DP: u32 = 2;

/// Rounds half away from zero to `MONEY_DP` places and pads the scale, so
/// `6000` comes out as `6000.00`.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_DP);
    rounded
}

/// Exact arithmetic mean, unrounded. `None` for an empty list or when the
/// total does not fit in a `Decimal`.
pub fn average(amounts: &[Decimal]) -> Option<Decimal> {
    if amounts.is_empty() {
        return None;
    }
    let total = amounts
        .iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(*amount))?;
    total.checked_div(Decimal::from(amounts.len()))
}

fn overflow(employee_name: &str, step: &str) -> CalcError {
    CalcError::ArithmeticOverflow {
        employee: employee_name.to_string(),
        step: step.to_string(),
    }
}

/// Clamps `avg_salary` into `[base_min, base_max]`. Assumes the standard is
/// well formed (`base_max >= base_min`).
pub fn contribution_base(avg_salary: Decimal, standard: &JurisdictionStandard) -> Decimal {
    if avg_salary < standard.base_min {
        standard.base_min
    } else if avg_salary > standard.base_max {
        standard.base_max
    } else {
        avg_salary
    }
}

/// Builds one employee's result, `Ok(None)` when there are no amounts. Each
/// reported figure is rounded on its own; the clamp sees the unrounded
/// average and the fee the unrounded base.
pub fn compute(
    employee_name: &str,
    amounts: &[Decimal],
    standard: &JurisdictionStandard,
    computed_at: DateTime<Utc>,
) -> Result<Option<ContributionResult>> {
    if amounts.is_empty() {
        return Ok(None);
    }
    let avg_salary = average(amounts).ok_or_else(|| overflow(employee_name, "average salary"))?;
    let base = contribution_base(avg_salary, standard);
    let fee = base
        .checked_mul(standard.rate)
        .ok_or_else(|| overflow(employee_name, "company fee"))?;

    Ok(Some(ContributionResult {
        employee_name: employee_name.to_string(),
        avg_salary: round_money(avg_salary),
        contribution_base: round_money(base),
        company_fee: round_money(fee),
        computed_at,
    }))
}
