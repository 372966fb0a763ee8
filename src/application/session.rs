use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};

/// Owner key scoping every collaborator request. Created at sign-in and
/// dropped at sign-out; nothing reads ambient global state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    email: String,
}

impl Session {
    pub fn sign_in(email: &str) -> Result<Session, InfraError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(InfraError::InvalidConfig(
                "owner e-mail must not be empty".to_string(),
            ));
        }
        if !email.contains('@') {
            return Err(InfraError::InvalidConfig(format!(
                "owner e-mail '{email}' is not a valid address"
            )));
        }
        Ok(Session {
            email: email.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_trims_and_keeps_address() {
        let session = Session::sign_in("  runner@example.com ").expect("valid session");
        assert_eq!(session.owner(), "runner@example.com");
    }

    #[test]
    fn sign_in_rejects_blank_or_malformed_addresses() {
        assert!(Session::sign_in("   ").is_err());
        assert!(Session::sign_in("runner.example.com").is_err());
    }
}
