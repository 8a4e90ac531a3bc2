use crate::utils::error::{CalcError, Result};
use std::fmt::Display;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid_setting(field_name: &str, value: impl Display, reason: impl Into<String>) -> CalcError {
    CalcError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// The data directory must be something the store can create and join
/// table names onto.
pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid_setting(
            field_name,
            path,
            "data directory is not set; point it at the folder holding the store tables",
        ));
    }
    if path.contains('\0') {
        return Err(invalid_setting(
            field_name,
            path.escape_default(),
            "data directory contains a NUL byte",
        ));
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(invalid_setting(
            field_name,
            value,
            format!("a calculation run needs at least {} here", min_value),
        ));
    }
    Ok(())
}

/// Jurisdiction names are matched exactly against imported standards, so a
/// blank one can never match.
pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid_setting(
            field_name,
            value,
            "blank name would never match an imported standard",
        ));
    }
    Ok(())
}

/// Bound check for one imported cell. The message goes into that row's
/// import error, so it names the column and the offending value.
pub fn check_range<T: PartialOrd + Display>(
    column: &str,
    value: T,
    min: T,
    max: T,
) -> std::result::Result<(), String> {
    if value < min || value > max {
        return Err(format!("{} {} is outside {}..={}", column, value, min, max));
    }
    Ok(())
}
