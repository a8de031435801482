use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;

/// Guacamole session token plus the locally estimated expiry.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: SecretString,
    pub obtained_at: DateTime<Utc>,
    /// obtained_at + assumed lifetime
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: String, obtained_at: DateTime<Utc>, assumed_lifetime: Duration) -> Self {
        Self {
            token: SecretString::from(token),
            obtained_at,
            expires_at: obtained_at + assumed_lifetime,
        }
    }

    /// A credential is usable strictly before its expiry instant.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Absent,
    Valid,
}

impl CredentialState {
    pub fn of(credential: Option<&Credential>, now: DateTime<Utc>) -> Self {
        match credential {
            Some(c) if c.is_valid_at(now) => CredentialState::Valid,
            _ => CredentialState::Absent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialState::Absent => "absent",
            CredentialState::Valid => "valid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn expiry_boundary_is_exclusive() {
        let t0 = Utc::now();
        let c = Credential::new("abc123".into(), t0, Duration::minutes(55));
        assert_eq!(c.expires_at, t0 + Duration::minutes(55));
        assert!(c.is_valid_at(c.expires_at - Duration::seconds(1)));
        assert!(!c.is_valid_at(c.expires_at));
        assert_eq!(CredentialState::of(Some(&c), t0), CredentialState::Valid);
        assert_eq!(CredentialState::of(Some(&c), c.expires_at), CredentialState::Absent);
        assert_eq!(CredentialState::of(None, t0), CredentialState::Absent);
    }

    #[test]
    fn debug_hides_token() {
        let c = Credential::new("super-secret".into(), Utc::now(), Duration::minutes(1));
        let printed = format!("{:?}", c);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("REDACTED"));
        assert_eq!(c.token.expose_secret(), "super-secret");
    }
}
