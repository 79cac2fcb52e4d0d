use serde::{Deserialize, Serialize};

use super::account::AccountRole;
use crate::error::AppError;

/// Claims issued by the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,

    #[serde(rename = "https://courts.app/claims/role")]
    pub role: AccountRole,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

/// The caller of a request, as vouched for by the identity provider.
#[derive(Debug, Clone)]
pub struct Identity {
    pub account_id: String,
    pub role: AccountRole,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    pub fn is_manager(&self) -> bool {
        self.role == AccountRole::Manager
    }

    pub fn require_manager(&self) -> Result<(), AppError> {
        if self.is_manager() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Manager role required".into()))
        }
    }
}
