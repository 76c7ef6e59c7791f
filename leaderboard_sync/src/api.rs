//! Request/response contract for whatever transport exposes leaderboards.
//!
//! Inputs deserialize from camelCase JSON (`tenantId`, `pageSize`), matching
//! what front-ends already send. Handlers validate and delegate to
//! [`LeaderboardQueryService`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{LeaderboardPage, LeaderboardQueryService, QueryError};

/// Page number used when a request omits it.
pub const DEFAULT_PAGE: u32 = 1;
/// Page size used when a request omits it.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Input of [`LeaderboardApi::get_leaderboard_data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardDataInput {
    /// Tenant to read.
    pub tenant_id: String,
    /// Casino tag.
    pub casino: String,
    /// 1-based page; defaults to [`DEFAULT_PAGE`].
    #[serde(default)]
    pub page: Option<u32>,
    /// Entries per page; defaults to [`DEFAULT_PAGE_SIZE`].
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// Input identifying one leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardScopeInput {
    /// Tenant to address.
    pub tenant_id: String,
    /// Casino tag.
    pub casino: String,
}

/// Output of [`LeaderboardApi::invalidate_cache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateOutput {
    /// Always `true` when returned.
    pub success: bool,
}

/// Stable leaderboard operations.
#[derive(Clone)]
pub struct LeaderboardApi {
    service: Arc<LeaderboardQueryService>,
}

impl LeaderboardApi {
    /// Wraps a shared query service.
    pub fn new(service: Arc<LeaderboardQueryService>) -> Self {
        Self { service }
    }

    /// One page of a leaderboard.
    pub async fn get_leaderboard_data(
        &self,
        input: LeaderboardDataInput,
    ) -> Result<LeaderboardPage, QueryError> {
        validate_scope(&input.tenant_id, &input.casino)?;
        self.service
            .get_page(
                &input.tenant_id,
                &input.casino,
                input.page.unwrap_or(DEFAULT_PAGE),
                input.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            )
            .await
    }

    /// A leaderboard's display configuration (`{}` when absent).
    pub async fn get_leaderboard_config(
        &self,
        input: LeaderboardScopeInput,
    ) -> Result<Value, QueryError> {
        validate_scope(&input.tenant_id, &input.casino)?;
        self.service
            .get_config(&input.tenant_id, &input.casino)
            .await
    }

    /// Drops every cached view of a leaderboard.
    pub async fn invalidate_cache(
        &self,
        input: LeaderboardScopeInput,
    ) -> Result<InvalidateOutput, QueryError> {
        validate_scope(&input.tenant_id, &input.casino)?;
        self.service
            .invalidate(&input.tenant_id, &input.casino)
            .await?;
        Ok(InvalidateOutput { success: true })
    }
}

fn validate_scope(tenant_id: &str, casino: &str) -> Result<(), QueryError> {
    if tenant_id.trim().is_empty() {
        return Err(QueryError::InvalidArgument("tenantId must not be empty".into()));
    }
    if casino.trim().is_empty() {
        return Err(QueryError::InvalidArgument("casino must not be empty".into()));
    }
    Ok(())
}
