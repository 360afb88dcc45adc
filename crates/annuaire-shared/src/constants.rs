/// Maximum vouches a profile may receive, no matter who vouches.
pub const VOUCH_COUNT_LIMIT: u32 = 6;

/// Received vouches needed before a profile may vouch for others.
pub const CAN_VOUCH_THRESHOLD: u32 = 3;

/// Email domains whose owners are vouched automatically at verification time.
pub const AUTO_VOUCH_DOMAINS: [&str; 4] = [
    "mozilla.com",
    "mozilla.org",
    "mozillafoundation.org",
    "getpocket.com",
];

/// Description recorded on automatically created vouches.
pub const AUTO_VOUCH_REASON: &str = "An automatic vouch for being a staff member.";

/// Maximum length of a vouch description.
pub const VOUCH_DESCRIPTION_MAX_LEN: usize = 500;
