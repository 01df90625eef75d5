use std::collections::BTreeSet;

use time::ext::NumericalStdDuration as _;

use super::*;

/// Scoping options of a reclaimer instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    managed_namespaces: BTreeSet<String>,
    grace_period_seconds: u32,
    requeue_after: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            managed_namespaces: BTreeSet::new(),
            grace_period_seconds: 0,
            requeue_after: 5.std_seconds(),
        }
    }
}

impl Config {
    /// Restrict the reclaimer to `namespaces`. An empty set manages all of them.
    pub fn with_managed_namespaces<I, S>(self, namespaces: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let managed_namespaces = namespaces
            .into_iter()
            .map(Into::into)
            .map(validate_namespace)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            managed_namespaces,
            ..self
        })
    }

    /// Grace period passed along with the force delete, truncated to whole seconds
    pub fn with_force_delete_grace_period(self, period: Duration) -> Result<Self, ConfigError> {
        let seconds = period.as_secs();
        let grace_period_seconds =
            u32::try_from(seconds).map_err(|_| ConfigError::GracePeriodOutOfRange(seconds))?;
        Ok(Self {
            grace_period_seconds,
            ..self
        })
    }

    pub fn with_requeue_after(self, requeue_after: Duration) -> Self {
        Self {
            requeue_after,
            ..self
        }
    }

    /// Whether pods in `namespace` are in scope
    pub fn manages(&self, namespace: &str) -> bool {
        self.managed_namespaces.is_empty() || self.managed_namespaces.contains(namespace)
    }

    pub fn managed_namespaces(&self) -> impl Iterator<Item = &str> {
        self.managed_namespaces.iter().map(String::as_str)
    }

    /// The only managed namespace, if the instance is scoped to exactly one
    pub fn single_namespace(&self) -> Option<&str> {
        let mut namespaces = self.managed_namespaces();
        match (namespaces.next(), namespaces.next()) {
            (Some(namespace), None) => Some(namespace),
            _ => None,
        }
    }

    pub fn grace_period_seconds(&self) -> u32 {
        self.grace_period_seconds
    }

    pub fn requeue_after(&self) -> Duration {
        self.requeue_after
    }
}

/// Parse a Go style duration such as `0s`, `5s` or `1m30s`.
///
/// Negative durations are rejected.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// let delay = sts_reclaimer::parse_duration("1m30s").unwrap();
/// assert_eq!(delay, Duration::from_secs(90));
/// ```
pub fn parse_duration(text: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidDuration {
        value: text.to_string(),
        reason,
    };
    let nanos = go_parse_duration::parse_duration(text).map_err(|err| invalid(format!("{err:?}")))?;
    u64::try_from(nanos)
        .map(Duration::from_nanos)
        .map_err(|_| invalid("duration must not be negative".to_string()))
}

fn validate_namespace(namespace: String) -> Result<String, ConfigError> {
    let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
    let valid = !namespace.is_empty()
        && namespace.len() <= 63
        && namespace.chars().all(valid_char)
        && !namespace.starts_with('-')
        && !namespace.ends_with('-');
    if valid {
        Ok(namespace)
    } else {
        Err(ConfigError::InvalidNamespace(namespace))
    }
}
