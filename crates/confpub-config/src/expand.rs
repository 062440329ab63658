//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a config value.
///
/// `field` names the config key in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(
            expand_env("https://confluence.example.com", "confluence.base_url").unwrap(),
            "https://confluence.example.com"
        );
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = expand_env(
            "${CONFPUB_TEST_SURELY_UNSET_VAR:-fallback}",
            "confluence.access_token",
        )
        .unwrap();
        assert_eq!(value, "fallback");
    }

    #[test]
    fn test_unset_without_default_errors() {
        let err = expand_env("${CONFPUB_TEST_SURELY_UNSET_VAR}", "confluence.access_token")
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert_eq!(
            err.to_string(),
            "Environment variable error in confluence.access_token: \
             ${CONFPUB_TEST_SURELY_UNSET_VAR} not set"
        );
    }
}
