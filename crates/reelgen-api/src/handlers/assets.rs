//! Asset ownership and visibility handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use reelgen_models::{GenerationRecord, Visibility};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ClaimParams {
    pub user: Option<String>,
    pub salt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PublishParams {
    pub user: Option<String>,
}

/// The claim/publish endpoints act on behalf of the `user` query parameter;
/// the bearer token's subject must match it.
fn require_user(auth: &AuthUser, user: Option<&str>) -> ApiResult<String> {
    let user = user
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("user query parameter is required"))?;
    if auth.uid != user {
        return Err(ApiError::forbidden("token subject does not match user"));
    }
    Ok(user.to_string())
}

/// Claim ownership of an asset.
///
/// GET /v1/claim/{asset_id}?user=...&salt=...
pub async fn claim_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Query(params): Query<ClaimParams>,
    auth: AuthUser,
) -> ApiResult<Json<GenerationRecord>> {
    // The salt is a per-session marker issued alongside the asset link; its
    // presence is required but its value is not checked.
    match params.salt.as_deref() {
        Some(s) if !s.is_empty() => {}
        _ => return Err(ApiError::unauthorized("missing salt")),
    }
    let user = require_user(&auth, params.user.as_deref())?;

    let record = state.store.claim(&asset_id, &user).await?;
    Ok(Json(record))
}

/// Publish an asset to the community feed.
///
/// GET /v1/publish/{asset_id}?user=...
pub async fn publish_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Query(params): Query<PublishParams>,
    auth: AuthUser,
) -> ApiResult<Json<GenerationRecord>> {
    let user = require_user(&auth, params.user.as_deref())?;
    let record = state
        .store
        .set_visibility(&asset_id, &user, Visibility::Community)
        .await?;
    Ok(Json(record))
}

/// Withdraw an asset from the community feed.
///
/// DELETE /v1/publish/{asset_id}?user=...
pub async fn unpublish_asset(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Query(params): Query<PublishParams>,
    auth: AuthUser,
) -> ApiResult<Json<GenerationRecord>> {
    let user = require_user(&auth, params.user.as_deref())?;
    let record = state
        .store
        .set_visibility(&asset_id, &user, Visibility::Private)
        .await?;
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_user_matches_token_subject() {
        let auth = AuthUser {
            uid: "u1".to_string(),
        };
        assert_eq!(require_user(&auth, Some("u1")).unwrap(), "u1");
        assert!(matches!(
            require_user(&auth, Some("u2")),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            require_user(&auth, None),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            require_user(&auth, Some("")),
            Err(ApiError::BadRequest(_))
        ));
    }
}
