use serde::{Deserialize, Serialize};

/// Whether the app may use location services, as decided by the user or the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    /// The user refused access, or location services are off.
    Denied,
    /// Access is blocked by policy (e.g., parental controls) and cannot be granted.
    Restricted,
    /// Access is granted at any time, including in the background.
    AuthorizedAlways,
    /// Access is granted while the app is in use.
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    /// Returns `true` if location may be requested under this status.
    #[must_use]
    pub const fn is_authorized(self) -> bool {
        matches!(self, Self::AuthorizedAlways | Self::AuthorizedWhenInUse)
    }
}

#[cfg(test)]
mod tests {
    use super::AuthorizationStatus;

    #[test]
    fn only_granted_variants_are_authorized() {
        assert!(AuthorizationStatus::AuthorizedAlways.is_authorized());
        assert!(AuthorizationStatus::AuthorizedWhenInUse.is_authorized());
        assert!(!AuthorizationStatus::NotDetermined.is_authorized());
        assert!(!AuthorizationStatus::Denied.is_authorized());
        assert!(!AuthorizationStatus::Restricted.is_authorized());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&AuthorizationStatus::AuthorizedWhenInUse).unwrap();
        assert_eq!(json, "\"authorized_when_in_use\"");

        let status: AuthorizationStatus = serde_json::from_str("\"not_determined\"").unwrap();
        assert_eq!(status, AuthorizationStatus::NotDetermined);
    }
}
