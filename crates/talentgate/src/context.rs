use crate::error::AppError;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account identifier issued by the hosted auth provider. Candidate and
/// employer records are keyed by the same identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// Role attached to the authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Candidate,
    Employer,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Employer => "employer",
            Role::Admin => "admin",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "candidate" => Some(Role::Candidate),
            "employer" => Some(Role::Employer),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Authenticated identity threaded into every core operation as an explicit
/// parameter, never ambient state. Built by the routers from the identity
/// headers the fronting auth gateway injects.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext {
    pub user_id: UserId,
    pub role: Role,
}

impl RequestContext {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Extract identity from `x-user-id` / `x-user-role` headers.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let user_id = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value).ok())
            .ok_or(AppError::Unauthorized)?;
        let role = headers
            .get("x-user-role")
            .and_then(|value| value.to_str().ok())
            .and_then(Role::parse)
            .ok_or(AppError::Unauthorized)?;

        Ok(Self::new(UserId(user_id), role))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "operation requires the admin role, session has {}",
                self.role.label()
            )))
        }
    }

    /// True when the session belongs to the given account, in the given role.
    pub fn acts_as(&self, role: Role, account: Uuid) -> bool {
        self.role == role && self.user_id.0 == account
    }
}
