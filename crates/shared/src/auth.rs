//! Authentication claims for JWT tokens.
//!
//! Authentication itself (login, sessions, password handling) is an
//! external collaborator. The API layer only needs enough identity to
//! gate approval decisions: who the caller is, which company they belong
//! to, their role, and whether they are flagged as an approver.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// Company ID (current context).
    pub company: Uuid,
    /// User's role (`employee`, `manager`, `admin`).
    pub role: String,
    /// Whether this user is flagged as an approver.
    pub approver: bool,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(
        user_id: Uuid,
        company_id: Uuid,
        role: &str,
        approver: bool,
        expires_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            company: company_id,
            role: role.to_string(),
            approver,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the company ID from claims.
    #[must_use]
    pub const fn company_id(&self) -> Uuid {
        self.company
    }

    /// Returns true if the caller holds administrator capability.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Returns true if the caller may act on approval requests.
    ///
    /// Admins always can; managers only when flagged as approvers.
    #[must_use]
    pub fn can_approve(&self) -> bool {
        self.is_admin() || (self.role == "manager" && self.approver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str, approver: bool) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            role,
            approver,
            Utc::now() + chrono::Duration::minutes(15),
        )
    }

    #[test]
    fn test_admin_can_approve() {
        let c = claims("admin", false);
        assert!(c.is_admin());
        assert!(c.can_approve());
    }

    #[test]
    fn test_manager_needs_approver_flag() {
        assert!(claims("manager", true).can_approve());
        assert!(!claims("manager", false).can_approve());
    }

    #[test]
    fn test_employee_cannot_approve() {
        let c = claims("employee", true);
        assert!(!c.is_admin());
        assert!(!c.can_approve());
    }
}
