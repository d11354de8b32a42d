//! Request field checks shared by every resource kind.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::error::{GatewayError, GatewayResult};

const MAX_NAME_LEN: usize = 63;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("name pattern compiles")
    })
}

/// Resource names are DNS-1123 labels: lower-case alphanumerics and `-`,
/// alphanumeric at both ends, at most 63 characters.
pub fn validate_name(field: &str, name: &str) -> GatewayResult<()> {
    if name.is_empty() {
        return Err(GatewayError::validation(field, "name is required"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(GatewayError::validation(
            field,
            format!("name must be at most {} characters", MAX_NAME_LEN),
        ));
    }
    if !name_pattern().is_match(name) {
        return Err(GatewayError::validation(
            field,
            format!(
                "{:?} must consist of lower case alphanumeric characters or '-', \
                 and start and end with an alphanumeric character",
                name
            ),
        ));
    }
    Ok(())
}

fn mac_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9a-fA-F]{2}(:[0-9a-fA-F]{2}){5}$").expect("mac pattern compiles")
    })
}

/// An empty MAC address is accepted; the controller generates one.
pub fn validate_mac_address(field: &str, mac: &str) -> GatewayResult<()> {
    if !mac.is_empty() && !mac_pattern().is_match(mac) {
        return Err(GatewayError::validation(
            field,
            format!("{:?} is not a colon separated 48-bit MAC address", mac),
        ));
    }
    Ok(())
}

pub fn require_non_empty(field: &str, value: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::validation(field, "value is required"));
    }
    Ok(())
}
