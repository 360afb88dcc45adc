//! Directory configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the library works with zero
//! configuration; deployments override the vouch limits and the auto-vouch
//! domain allowlist.

use crate::constants;

/// Tunables for the vouch graph and auto-vouch rules.
///
/// Threaded explicitly into every vouch operation; never read from global
/// state.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Maximum vouches a profile may receive.
    /// Env: `VOUCH_COUNT_LIMIT`
    /// Default: `6`
    pub vouch_count_limit: u32,

    /// Received vouches needed before a profile may vouch for others.
    /// Env: `CAN_VOUCH_THRESHOLD`
    /// Default: `3`
    pub can_vouch_threshold: u32,

    /// Email domains whose owners are vouched automatically.
    /// Env: `AUTO_VOUCH_DOMAINS` (comma-separated)
    pub auto_vouch_domains: Vec<String>,

    /// Description recorded on automatically created vouches.
    pub auto_vouch_reason: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            vouch_count_limit: constants::VOUCH_COUNT_LIMIT,
            can_vouch_threshold: constants::CAN_VOUCH_THRESHOLD,
            auto_vouch_domains: constants::AUTO_VOUCH_DOMAINS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            auto_vouch_reason: constants::AUTO_VOUCH_REASON.to_string(),
        }
    }
}

impl DirectoryConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("VOUCH_COUNT_LIMIT") {
            if let Ok(n) = val.parse::<u32>() {
                config.vouch_count_limit = n;
            } else {
                tracing::warn!(value = %val, "Invalid VOUCH_COUNT_LIMIT, using default");
            }
        }

        if let Ok(val) = std::env::var("CAN_VOUCH_THRESHOLD") {
            if let Ok(n) = val.parse::<u32>() {
                config.can_vouch_threshold = n;
            } else {
                tracing::warn!(value = %val, "Invalid CAN_VOUCH_THRESHOLD, using default");
            }
        }

        if let Ok(val) = std::env::var("AUTO_VOUCH_DOMAINS") {
            let domains: Vec<String> = val
                .split(',')
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect();
            if !domains.is_empty() {
                config.auto_vouch_domains = domains;
            }
        }

        config
    }

    /// Whether `email` belongs to one of the auto-vouch domains.
    pub fn is_auto_vouch_email(&self, email: &str) -> bool {
        let email = email.to_ascii_lowercase();
        self.auto_vouch_domains
            .iter()
            .any(|domain| email.ends_with(&format!("@{domain}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let config = DirectoryConfig::default();
        assert_eq!(config.vouch_count_limit, 6);
        assert_eq!(config.can_vouch_threshold, 3);
        assert!(!config.auto_vouch_domains.is_empty());
    }

    #[test]
    fn auto_vouch_email_matching() {
        let config = DirectoryConfig::default();
        assert!(config.is_auto_vouch_email("jdoe@mozilla.com"));
        assert!(config.is_auto_vouch_email("JDOE@Mozilla.Org"));
        assert!(!config.is_auto_vouch_email("jdoe@example.com"));
        // Domain must match the full label, not a suffix of it.
        assert!(!config.is_auto_vouch_email("jdoe@notmozilla.com"));
    }
}
