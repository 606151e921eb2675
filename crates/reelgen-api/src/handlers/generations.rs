//! Generation record read and listing handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use reelgen_models::{GenerationAction, GenerationRecord, Visibility};
use reelgen_store::{ListQuery, Page};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Pagination query parameters shared by the listing endpoints.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Action filter; only meaningful on /v1/generations.
    #[serde(rename = "type")]
    pub action: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl ListParams {
    fn to_query(&self) -> ListQuery {
        ListQuery {
            limit: self.limit,
            cursor: self.cursor.clone(),
        }
    }
}

/// One page of records plus the resume cursor.
#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub items: Vec<GenerationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<Page> for PageResponse {
    fn from(page: Page) -> Self {
        Self {
            items: page.items,
            next_cursor: page.next_cursor,
        }
    }
}

/// Fetch a single generation record.
///
/// GET /v1/generation/{id}
pub async fn get_generation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<GenerationRecord>> {
    let record = state.store.read(&id).await?;
    Ok(Json(record))
}

/// List generations of one action type, newest first.
///
/// GET /v1/generations?type=txt2img&cursor=...&limit=...
pub async fn list_generations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PageResponse>> {
    let action = params
        .action
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("type query parameter is required"))?;
    let action = GenerationAction::parse(action)
        .ok_or_else(|| ApiError::bad_request(format!("unknown generation type: {action}")))?;

    let page = state
        .store
        .list_by_action(action.as_str(), &params.to_query())
        .await?;
    Ok(Json(page.into()))
}

/// List a user's generations, newest first.
///
/// GET /v1/user/{user_id}/generations
pub async fn list_user_generations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PageResponse>> {
    let page = state
        .store
        .list_by_user(&user_id, &params.to_query())
        .await?;
    Ok(Json(page.into()))
}

/// List community-visible generations, newest first.
///
/// GET /v1/community/generations
pub async fn list_community_generations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<PageResponse>> {
    let page = state
        .store
        .list_by_visibility(Visibility::Community, &params.to_query())
        .await?;
    Ok(Json(page.into()))
}
