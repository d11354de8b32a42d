//! # Response Projector helpers
//!
//! Status is owned by the reconciliation controller and may be missing
//! entirely right after a create. Views never expose `null` for status
//! fields: absent values project to empty strings, lists, or maps.

/// Status as last reported, or an all-empty status when none was written yet
pub fn observed<S: Clone + Default>(status: Option<&S>) -> S {
    status.cloned().unwrap_or_default()
}

/// The spec value when the client set one, otherwise what the controller reported
pub fn prefer_spec(spec_value: &str, reported: &str) -> String {
    if spec_value.is_empty() {
        reported.to_string()
    } else {
        spec_value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Status {
        state: String,
    }

    #[test]
    fn test_missing_status_projects_empty() {
        assert_eq!(observed::<Status>(None), Status::default());
        let status = Status {
            state: "Running".to_string(),
        };
        assert_eq!(observed(Some(&status)).state, "Running");
    }

    #[test]
    fn test_prefer_spec_falls_back_to_reported() {
        assert_eq!(prefer_spec("", "node-2"), "node-2");
        assert_eq!(prefer_spec("node-1", "node-2"), "node-1");
        assert_eq!(prefer_spec("", ""), "");
    }
}
