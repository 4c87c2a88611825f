use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{AppState, entities::user, error::AppError, models::Identity};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const EMAIL_HEADER: &str = "x-user-email";
pub const FIRST_NAME_HEADER: &str = "x-user-first-name";
pub const LAST_NAME_HEADER: &str = "x-user-last-name";
pub const PROFILE_IMAGE_HEADER: &str = "x-user-profile-image";

/// The signed-in user, taken from the identity proxy's headers. The user row
/// is upserted on every authenticated request.
#[derive(Clone, Debug)]
pub struct AuthUser(pub user::Model);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.id
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let identity = identity_from_parts(parts).ok_or(AppError::Unauthorized)?;
        let user = state.library.upsert_user(&identity).await?;
        Ok(Self(user))
    }
}

fn identity_from_parts(parts: &Parts) -> Option<Identity> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Some(Identity {
        id: header(USER_ID_HEADER)?,
        email: header(EMAIL_HEADER),
        first_name: header(FIRST_NAME_HEADER),
        last_name: header(LAST_NAME_HEADER),
        profile_image_url: header(PROFILE_IMAGE_HEADER),
    })
}
