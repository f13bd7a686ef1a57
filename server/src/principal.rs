//! The authenticated actor behind a request.
//!
//! Authentication itself happens upstream; the gateway forwards the
//! resolved identity as `X-User-Id` / `X-User-Role` headers. Requests
//! without a valid pair are rejected before any handler runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Engineer,
    Manager,
    Leader,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Engineer => "engineer",
            Role::Manager => "manager",
            Role::Leader => "leader",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "engineer" => Ok(Role::Engineer),
            "manager" => Ok(Role::Manager),
            "leader" => Ok(Role::Leader),
            _ => Err(()),
        }
    }
}

/// Resolved identity of the caller: id plus role, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let role = parts
            .headers
            .get("x-user-role")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Role>().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Principal { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_the_three_known_values() {
        assert_eq!("engineer".parse(), Ok(Role::Engineer));
        assert_eq!("manager".parse(), Ok(Role::Manager));
        assert_eq!("leader".parse(), Ok(Role::Leader));
    }

    #[test]
    fn role_rejects_unknown_and_cased_values() {
        assert!("admin".parse::<Role>().is_err());
        assert!("Leader".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Engineer, Role::Manager, Role::Leader] {
            assert_eq!(role.as_str().parse(), Ok(role));
        }
    }
}
