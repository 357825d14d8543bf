//! Master-key gate for administrative operations.

use constant_time_eq::constant_time_eq;

use crate::errors::ServiceError;

/// Holds the configured master key; `None` means administrative calls are refused.
#[derive(Clone)]
pub struct AccessControl {
    master_key: Option<String>,
}

impl AccessControl {
    pub fn new(master_key: impl Into<String>) -> Self {
        let key = master_key.into();
        let master_key = (!key.trim().is_empty()).then_some(key);
        Self { master_key }
    }

    pub fn is_configured(&self) -> bool { self.master_key.is_some() }

    /// Compare the supplied secret with the master key in constant time.
    pub fn authorize(&self, supplied: Option<&str>) -> Result<(), ServiceError> {
        let Some(expected) = self.master_key.as_deref() else {
            return Err(ServiceError::Unauthorized("master key not configured".into()));
        };
        match supplied {
            Some(s) if constant_time_eq(s.as_bytes(), expected.as_bytes()) => Ok(()),
            _ => Err(ServiceError::Unauthorized("invalid master key".into())),
        }
    }
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl").field("configured", &self.is_configured()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_key_is_authorized() {
        let acl = AccessControl::new("secret");
        assert!(acl.authorize(Some("secret")).is_ok());
    }

    #[test]
    fn wrong_or_missing_key_is_rejected() {
        let acl = AccessControl::new("secret");
        assert!(matches!(acl.authorize(Some("secreT")), Err(ServiceError::Unauthorized(_))));
        assert!(matches!(acl.authorize(Some("secret2")), Err(ServiceError::Unauthorized(_))));
        assert!(matches!(acl.authorize(None), Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn empty_master_key_refuses_everything() {
        let acl = AccessControl::new("  ");
        assert!(!acl.is_configured());
        assert!(acl.authorize(Some("  ")).is_err());
        assert!(acl.authorize(Some("")).is_err());
    }

    #[test]
    fn debug_output_hides_secret() {
        let acl = AccessControl::new("secret");
        assert!(!format!("{acl:?}").contains("secret"));
    }
}
