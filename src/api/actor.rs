//! Caller identity forwarded by the auth gateway.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::Error;
use crate::models::{Actor, Role};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const USER_BRANCHES_HEADER: &str = "x-user-branches";

/// Extracts the calling [`Actor`]; rejects with 401 when the id or role is
/// missing or unreadable.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentActor {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header(USER_ID_HEADER).ok_or(Error::Unauthorized)?;
        let role: Role = header(USER_ROLE_HEADER)
            .ok_or(Error::Unauthorized)?
            .parse()
            .map_err(|_| Error::Unauthorized)?;
        let branches = header(USER_BRANCHES_HEADER)
            .map(|list| {
                list.split(',')
                    .map(|code| code.trim().to_uppercase())
                    .filter(|code| !code.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(CurrentActor(Actor {
            id: id.to_string(),
            name: header(USER_NAME_HEADER).map(str::to_string),
            role,
            branches,
        }))
    }
}
