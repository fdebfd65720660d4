//! Integration management, scoped to the caller's workspace

use axum::extract::{Path, State};
use axum::Json;
use relaygate_domain::{GatewayError, Integration};
use serde::Serialize;
use tracing::info;

use super::SharedContext;
use crate::error::ApiResult;
use crate::extract::Caller;

#[derive(Debug, Serialize)]
pub struct IntegrationList {
    pub integrations: Vec<Integration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectResponse {
    pub integration_id: String,
    pub revoked_upstream: bool,
}

/// GET /integrations
pub async fn list(State(ctx): State<SharedContext>, caller: Caller) -> ApiResult<Json<IntegrationList>> {
    let integrations = ctx.store.list_by_workspace(&caller.workspace_id).await?;
    Ok(Json(IntegrationList { integrations }))
}

/// GET /integrations/{id}
pub async fn get(
    State(ctx): State<SharedContext>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Integration>> {
    Ok(Json(owned(&ctx, &caller, &id).await?))
}

/// DELETE /integrations/{id}
pub async fn disconnect(
    State(ctx): State<SharedContext>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<DisconnectResponse>> {
    owned(&ctx, &caller, &id).await?;
    let done = ctx.orchestrator.disconnect(&id).await?;
    info!(integration_id = %id, user_id = %caller.user_id, "integration.disconnect.requested");
    Ok(Json(DisconnectResponse {
        integration_id: done.integration_id,
        revoked_upstream: done.revoked_upstream,
    }))
}

/// POST /integrations/{id}/refresh
pub async fn refresh(
    State(ctx): State<SharedContext>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<Integration>> {
    owned(&ctx, &caller, &id).await?;
    Ok(Json(ctx.orchestrator.refresh_integration(&id).await?))
}

/// Integrations of other workspaces look like they do not exist.
async fn owned(ctx: &SharedContext, caller: &Caller, id: &str) -> Result<Integration, GatewayError> {
    let integration = ctx.store.get(id).await?;
    if integration.workspace_id != caller.workspace_id {
        return Err(GatewayError::IntegrationNotFound(id.to_string()));
    }
    Ok(integration)
}
