//! Generations table client.

use std::collections::HashMap;
use std::time::Instant;

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use tracing::{debug, info};

use reelgen_models::{GenerationRecord, Visibility, SHARED_PLACEHOLDER_USER};

use crate::attrs::{item_to_record, record_to_item};
use crate::cursor::Cursor;
use crate::error::{StoreError, StoreResult};
use crate::metrics;

/// Default listing page size.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Upper bound on a single listing page.
const MAX_PAGE_SIZE: usize = 100;

const ACTION_INDEX: &str = "action-timestamp-index";
const USERID_INDEX: &str = "userid-timestamp-index";
const VISIBILITY_INDEX: &str = "visibility-timestamp-index";

/// Configuration for the generations table.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Table name.
    pub table: String,
    /// AWS region.
    pub region: String,
    /// Custom endpoint (local testing); AWS default when absent.
    pub endpoint_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: "generations".to_string(),
            region: "us-east-1".to_string(),
            endpoint_url: None,
        }
    }
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            table: std::env::var("GENERATIONS_TABLE").unwrap_or(defaults.table),
            region: std::env::var("AWS_REGION").unwrap_or(defaults.region),
            endpoint_url: std::env::var("DYNAMODB_ENDPOINT_URL").ok(),
        }
    }
}

/// Pagination parameters for listings.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Page size; defaults to [`DEFAULT_PAGE_SIZE`], clamped to 100.
    pub limit: Option<usize>,
    /// Opaque resume cursor from a previous page.
    pub cursor: Option<String>,
}

impl ListQuery {
    fn page_size(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// One page of a timestamp-descending listing.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<GenerationRecord>,
    /// Cursor for the next page; absent on the last page.
    pub next_cursor: Option<String>,
}

/// Client for the generations table.
#[derive(Clone)]
pub struct GenerationsTable {
    client: Client,
    config: StoreConfig,
}

impl GenerationsTable {
    /// Create a new table client from configuration.
    pub async fn new(config: StoreConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_types::region::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        Self {
            client: Client::new(&sdk_config),
            config,
        }
    }

    /// Create from environment variables.
    pub async fn from_env() -> Self {
        Self::new(StoreConfig::from_env()).await
    }

    /// Persist a record, overwriting any item at the same `(id, timestamp)`.
    ///
    /// Overwrite is how pending records become terminal.
    pub async fn save(&self, record: &GenerationRecord) -> StoreResult<()> {
        let access = "save";
        let started = Instant::now();
        let item = record_to_item(record)?;

        let result = self
            .client
            .put_item()
            .table_name(&self.config.table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::backend(access, e.to_string()));

        self.observe(access, started, &result);
        result?;
        debug!(id = %record.id, action = %record.action.as_str(), "saved generation record");
        Ok(())
    }

    /// Fetch a record by id. Ids are unique, so the partition holds one item.
    pub async fn read(&self, id: &str) -> StoreResult<GenerationRecord> {
        let access = "read";
        let started = Instant::now();

        let result = self
            .client
            .query()
            .table_name(&self.config.table)
            .key_condition_expression("id = :id")
            .expression_attribute_values(":id", AttributeValue::S(id.to_string()))
            .limit(1)
            .send()
            .await
            .map_err(|e| StoreError::backend(access, e.to_string()));

        self.observe(access, started, &result);
        let output = result?;

        match output.items().first() {
            Some(item) => item_to_record(item),
            None => Err(StoreError::not_found(access, id)),
        }
    }

    /// List records by action, newest first.
    pub async fn list_by_action(&self, action: &str, query: &ListQuery) -> StoreResult<Page> {
        self.list_indexed("list_by_action", ACTION_INDEX, "action", action, query)
            .await
    }

    /// List records by owner, newest first.
    pub async fn list_by_user(&self, user_id: &str, query: &ListQuery) -> StoreResult<Page> {
        self.list_indexed("list_by_user", USERID_INDEX, "userid", user_id, query)
            .await
    }

    /// List records by visibility, newest first.
    pub async fn list_by_visibility(
        &self,
        visibility: Visibility,
        query: &ListQuery,
    ) -> StoreResult<Page> {
        self.list_indexed(
            "list_by_visibility",
            VISIBILITY_INDEX,
            "visibility",
            visibility.as_str(),
            query,
        )
        .await
    }

    /// Transfer ownership of an asset to `user_id`.
    ///
    /// Already-owned-by-caller is a no-op; anything owned by another real
    /// user is refused. The shared placeholder owner is claimable by anyone.
    pub async fn claim(&self, asset_id: &str, user_id: &str) -> StoreResult<GenerationRecord> {
        let access = "claim";
        let mut record = self.read(asset_id).await?;

        match claim_transition(record.userid.as_deref(), user_id) {
            ClaimTransition::AlreadyOwner => return Ok(record),
            ClaimTransition::Refused => {
                return Err(StoreError::forbidden(
                    access,
                    format!("asset {asset_id} is owned by another user"),
                ));
            }
            ClaimTransition::Take => {}
        }

        self.update_field(access, &record, "userid", AttributeValue::S(user_id.to_string()))
            .await?;
        record.userid = Some(user_id.to_string());
        info!(asset_id, user_id, "claimed asset");
        Ok(record)
    }

    /// Set an asset's visibility. Only the owner may change it.
    ///
    /// Publishing sets `community`; unpublishing sets `private`.
    pub async fn set_visibility(
        &self,
        asset_id: &str,
        user_id: &str,
        visibility: Visibility,
    ) -> StoreResult<GenerationRecord> {
        let access = "set_visibility";
        let mut record = self.read(asset_id).await?;

        if record.userid.as_deref() != Some(user_id) {
            return Err(StoreError::forbidden(
                access,
                format!("asset {asset_id} is not owned by the caller"),
            ));
        }

        self.update_field(
            access,
            &record,
            "visibility",
            AttributeValue::S(visibility.as_str().to_string()),
        )
        .await?;
        record.visibility = Some(visibility);
        info!(asset_id, visibility = visibility.as_str(), "changed asset visibility");
        Ok(record)
    }

    async fn update_field(
        &self,
        access: &str,
        record: &GenerationRecord,
        field: &str,
        value: AttributeValue,
    ) -> StoreResult<()> {
        let started = Instant::now();

        let result = self
            .client
            .update_item()
            .table_name(&self.config.table)
            .key("id", AttributeValue::S(record.id.clone()))
            .key("timestamp", AttributeValue::N(record.timestamp.to_string()))
            .update_expression("SET #f = :v")
            .expression_attribute_names("#f", field)
            .expression_attribute_values(":v", value)
            .send()
            .await
            .map_err(|e| StoreError::backend(access, e.to_string()));

        self.observe(access, started, &result);
        result?;
        Ok(())
    }

    async fn list_indexed(
        &self,
        access: &str,
        index: &str,
        key_attr: &str,
        key_value: &str,
        query: &ListQuery,
    ) -> StoreResult<Page> {
        let started = Instant::now();
        let limit = query.page_size();

        let mut request = self
            .client
            .query()
            .table_name(&self.config.table)
            .index_name(index)
            .key_condition_expression("#k = :v")
            .expression_attribute_names("#k", key_attr)
            .expression_attribute_values(":v", AttributeValue::S(key_value.to_string()))
            .scan_index_forward(false)
            .limit(limit as i32);

        if let Some(encoded) = &query.cursor {
            let cursor = Cursor::decode(encoded)?;
            request = request.set_exclusive_start_key(Some(start_key(key_attr, &cursor)));
        }

        let result = request
            .send()
            .await
            .map_err(|e| StoreError::backend(access, e.to_string()));

        self.observe(access, started, &result);
        let output = result?;

        let items = output
            .items()
            .iter()
            .map(item_to_record)
            .collect::<StoreResult<Vec<_>>>()?;
        let next_cursor = output
            .last_evaluated_key()
            .map(|key| cursor_from_key(key_attr, key))
            .transpose()?
            .map(|c| c.encode());

        Ok(Page { items, next_cursor })
    }

    fn observe<T>(&self, access: &str, started: Instant, result: &StoreResult<T>) {
        let status = match result {
            Ok(_) => 200,
            Err(e) => e.status_code(),
        };
        metrics::record_request(access, status, started.elapsed().as_secs_f64() * 1000.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimTransition {
    AlreadyOwner,
    Take,
    Refused,
}

/// Ownership rule for a claim: the owner keeps the asset (no-op), unowned
/// assets and assets held by the shared placeholder are takeable, anything
/// else is refused.
fn claim_transition(current_owner: Option<&str>, user_id: &str) -> ClaimTransition {
    match current_owner {
        Some(owner) if owner == user_id => ClaimTransition::AlreadyOwner,
        Some(owner) if owner != SHARED_PLACEHOLDER_USER => ClaimTransition::Refused,
        _ => ClaimTransition::Take,
    }
}

/// Resume key for an index query: table primary key plus the index partition.
fn start_key(key_attr: &str, cursor: &Cursor) -> HashMap<String, AttributeValue> {
    HashMap::from([
        ("id".to_string(), AttributeValue::S(cursor.id.clone())),
        (
            "timestamp".to_string(),
            AttributeValue::N(cursor.timestamp.to_string()),
        ),
        (
            key_attr.to_string(),
            AttributeValue::S(cursor.index_key.clone()),
        ),
    ])
}

fn cursor_from_key(
    key_attr: &str,
    key: &HashMap<String, AttributeValue>,
) -> StoreResult<Cursor> {
    let get_s = |name: &str| -> StoreResult<String> {
        key.get(name)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .ok_or_else(|| {
                StoreError::backend("list", format!("page key missing attribute {name}"))
            })
    };
    let id = get_s("id")?;
    let index_key = get_s(key_attr)?;
    let timestamp = key
        .get("timestamp")
        .and_then(|v| v.as_n().ok())
        .and_then(|n| n.parse::<i64>().ok())
        .ok_or_else(|| StoreError::backend("list", "page key missing timestamp"))?;
    Ok(Cursor::new(id, index_key, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_defaults_and_clamps() {
        assert_eq!(ListQuery::default().page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(
            ListQuery {
                limit: Some(0),
                cursor: None
            }
            .page_size(),
            1
        );
        assert_eq!(
            ListQuery {
                limit: Some(5000),
                cursor: None
            }
            .page_size(),
            MAX_PAGE_SIZE
        );
    }

    #[test]
    fn test_start_key_and_cursor_are_inverse() {
        let cursor = Cursor::new("a1b2c3d4e5", "img2vid", 1_700_000_000_000);
        let key = start_key("action", &cursor);
        assert_eq!(
            key["action"],
            AttributeValue::S("img2vid".to_string())
        );
        assert_eq!(key["id"], AttributeValue::S("a1b2c3d4e5".to_string()));

        let back = cursor_from_key("action", &key).unwrap();
        assert_eq!(back, cursor);
    }

    #[test]
    fn test_claim_transitions() {
        assert_eq!(claim_transition(Some("u1"), "u1"), ClaimTransition::AlreadyOwner);
        assert_eq!(claim_transition(Some("u2"), "u1"), ClaimTransition::Refused);
        assert_eq!(
            claim_transition(Some(SHARED_PLACEHOLDER_USER), "u1"),
            ClaimTransition::Take
        );
        assert_eq!(claim_transition(None, "u1"), ClaimTransition::Take);
    }

    #[test]
    fn test_cursor_from_incomplete_key_fails() {
        let key = HashMap::from([(
            "id".to_string(),
            AttributeValue::S("a1b2c3d4e5".to_string()),
        )]);
        assert!(cursor_from_key("action", &key).is_err());
    }
}
