use serde::{Deserialize, Serialize};

/// Identity provider behind an identity link.
///
/// The numeric codes double as an assurance ranking: a provider with a
/// higher code is considered at least as strong as one with a lower code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum ProviderType {
    Unknown = 0,
    Passwordless = 10,
    Google = 20,
    Github = 30,
    FirefoxAccounts = 31,
    Ldap = 40,
}

impl ProviderType {
    /// Providers strong enough to become the login identity automatically.
    pub const HIGH_ASSURANCE: [ProviderType; 4] = [
        ProviderType::Ldap,
        ProviderType::FirefoxAccounts,
        ProviderType::Github,
        ProviderType::Google,
    ];

    pub fn is_high_assurance(self) -> bool {
        Self::HIGH_ASSURANCE.contains(&self)
    }

    /// Derive the provider from the IdP subject id.
    ///
    /// Subject ids are prefixed with the upstream connection name, e.g.
    /// `github|1234567` or `ad|mozilla-LDAP|jdoe`.
    pub fn from_subject(subject: &str) -> Self {
        if subject.contains("ad|") {
            return Self::Ldap;
        }
        if subject.contains("oauth2|firefoxaccounts") {
            return Self::FirefoxAccounts;
        }
        if subject.contains("github|") {
            return Self::Github;
        }
        if subject.contains("google-oauth2|") {
            return Self::Google;
        }
        if subject.contains("email|") {
            return Self::Passwordless;
        }
        Self::Unknown
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unknown),
            10 => Some(Self::Passwordless),
            20 => Some(Self::Google),
            30 => Some(Self::Github),
            31 => Some(Self::FirefoxAccounts),
            40 => Some(Self::Ldap),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_prefix_detection() {
        assert_eq!(
            ProviderType::from_subject("ad|mozilla-LDAP|jdoe"),
            ProviderType::Ldap
        );
        assert_eq!(
            ProviderType::from_subject("oauth2|firefoxaccounts|abc123"),
            ProviderType::FirefoxAccounts
        );
        assert_eq!(
            ProviderType::from_subject("github|1234567"),
            ProviderType::Github
        );
        assert_eq!(
            ProviderType::from_subject("google-oauth2|99"),
            ProviderType::Google
        );
        assert_eq!(
            ProviderType::from_subject("email|abc"),
            ProviderType::Passwordless
        );
        assert_eq!(ProviderType::from_subject("sms|123"), ProviderType::Unknown);
    }

    #[test]
    fn assurance_ranking() {
        assert!(ProviderType::Ldap.is_high_assurance());
        assert!(ProviderType::Github.is_high_assurance());
        assert!(!ProviderType::Passwordless.is_high_assurance());
        assert!(ProviderType::Ldap > ProviderType::Github);
        assert!(ProviderType::FirefoxAccounts > ProviderType::Github);
    }
}
