use serde::{Deserialize, Serialize};

/// Visibility tier of a profile field, ordered from least to most
/// restricted.  A viewer holding clearance `c` sees a field whose privacy
/// level is `p` exactly when `c >= p`: the field names the narrowest
/// audience allowed to read it, the clearance names the widest audience the
/// viewer belongs to.
///
/// The numeric codes are what gets stored in SQLite; gaps are left so a tier
/// can be inserted without renumbering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum PrivacyLevel {
    /// Visible to everyone, including anonymous visitors.
    Public = 10,
    /// Visible to vouched members.
    Members = 20,
    /// Visible to staff.
    Employees = 30,
    /// Visible only to the owner and superusers.
    Private = 40,
}

impl PrivacyLevel {
    /// Every level, least restricted first.
    pub const ALL: [PrivacyLevel; 4] = [
        PrivacyLevel::Public,
        PrivacyLevel::Members,
        PrivacyLevel::Employees,
        PrivacyLevel::Private,
    ];

    /// Default level for a privacy-controlled profile field.
    pub const DEFAULT: PrivacyLevel = PrivacyLevel::Members;

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            10 => Some(Self::Public),
            20 => Some(Self::Members),
            30 => Some(Self::Employees),
            40 => Some(Self::Private),
            _ => None,
        }
    }
}

impl std::fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Public => "public",
            Self::Members => "members",
            Self::Employees => "employees",
            Self::Private => "private",
        };
        write!(f, "{name}")
    }
}
