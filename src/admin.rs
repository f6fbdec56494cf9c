use tracing::{info, warn};

use crate::config::AdminConfig;

/// Shared-password check guarding admin operations.
///
/// Admin is disabled when no password is configured; every check fails.
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    password: Option<String>,
}

impl AdminGate {
    pub fn new(password: Option<String>) -> Self {
        Self {
            password: password.filter(|p| !p.is_empty()),
        }
    }

    pub fn from_config(config: &AdminConfig) -> Self {
        Self::new(config.password.clone())
    }

    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    pub fn verify(&self, candidate: &str) -> bool {
        match &self.password {
            Some(password) if password == candidate => {
                info!("Admin unlocked");
                true
            }
            Some(_) => {
                warn!("Rejected admin password");
                false
            }
            None => {
                warn!("Admin password is not configured; admin is disabled");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify() {
        let gate = AdminGate::new(Some("secret".to_string()));
        assert!(gate.is_enabled());
        assert!(gate.verify("secret"));
        assert!(!gate.verify("Secret"));
        assert!(!gate.verify(""));
    }

    #[test]
    fn test_disabled_without_password() {
        let gate = AdminGate::from_config(&AdminConfig::default());
        assert!(!gate.is_enabled());
        assert!(!gate.verify(""));

        let empty = AdminGate::new(Some(String::new()));
        assert!(!empty.verify(""));
    }
}
