//! Request scope extraction.
//!
//! Every identity route is bound to an organization and the portal (origin
//! type) the request was sent from. Both come from headers and are handed to
//! services as an explicit [`RequestScope`].

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{RequestScope, UserType};

pub const ORGANIZATION_ID_HEADER: &str = "x-organization-id";
pub const ORIGIN_TYPE_HEADER: &str = "x-origin-type";

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, AppError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let organization_id = header(parts, ORGANIZATION_ID_HEADER)?
            .parse::<Uuid>()
            .map_err(|_| {
                AppError::BadRequest(anyhow::anyhow!(
                    "Invalid {} header",
                    ORGANIZATION_ID_HEADER
                ))
            })?;

        let origin_type = header(parts, ORIGIN_TYPE_HEADER)?
            .parse::<UserType>()
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

        Ok(RequestScope::new(organization_id, origin_type))
    }
}
