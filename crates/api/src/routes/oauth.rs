//! OAuth init and callback endpoints
//!
//! Both answer with `302 Found`. Callback failures never surface as HTTP
//! errors: the user is sent back to the app with `error` and
//! `error_description` query parameters.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use relaygate_core::InitRequest;
use relaygate_domain::{AuthorizationHints, CallbackParams, GatewayError, ProviderType};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use super::SharedContext;
use crate::error::{ApiError, ApiResult};
use crate::extract::Caller;

#[derive(Debug, Default, Deserialize)]
pub struct InitQuery {
    pub redirect_url: Option<String>,
    /// Slack workspace to preselect.
    pub team: Option<String>,
    /// Google account to preselect.
    pub login_hint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub installation_id: Option<String>,
    pub setup_action: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl From<CallbackQuery> for CallbackParams {
    fn from(query: CallbackQuery) -> Self {
        Self {
            code: non_empty(query.code),
            state: non_empty(query.state),
            installation_id: non_empty(query.installation_id),
            setup_action: non_empty(query.setup_action),
            error: non_empty(query.error),
            error_description: non_empty(query.error_description),
        }
    }
}

/// GET /integrations/oauth/{provider}/init
pub async fn init(
    State(ctx): State<SharedContext>,
    Path(provider): Path<String>,
    caller: Caller,
    Query(query): Query<InitQuery>,
) -> ApiResult<Response> {
    let provider: ProviderType = provider.parse()?;
    let redirect_url = non_empty(query.redirect_url).map(validate_redirect).transpose()?;

    let url = ctx
        .orchestrator
        .init(InitRequest {
            workspace_id: caller.workspace_id,
            user_id: caller.user_id,
            provider_type: provider,
            redirect_url,
            hints: AuthorizationHints {
                team: non_empty(query.team),
                login_hint: non_empty(query.login_hint),
            },
        })
        .await?;

    Ok(found(url))
}

/// GET /integrations/oauth/{provider}/callback
pub async fn callback(
    State(ctx): State<SharedContext>,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let provider: ProviderType = match provider.parse() {
        Ok(provider) => provider,
        Err(err) => return ApiError(err).into_response(),
    };
    let fallback = ctx.config.default_redirect_url();

    match ctx.orchestrator.complete_callback(provider, query.into()).await {
        Ok(done) => {
            let mut params = vec![("integration_id", done.integration_id.as_str()), ("success", "true")];
            if done.reconnected {
                params.push(("reconnected", "true"));
            }
            found(redirect_with(done.redirect_url.as_deref(), &fallback, &params))
        }
        Err(failure) => {
            warn!(provider = %provider, code = %failure.code, stage = %failure.stage, "oauth.callback.failed");
            found(redirect_with(
                failure.redirect_url.as_deref(),
                &fallback,
                &[("error", failure.code.as_str()), ("error_description", failure.message.as_str())],
            ))
        }
    }
}

fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Absolute http(s) URLs only.
fn validate_redirect(raw: String) -> Result<String, GatewayError> {
    match Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(raw),
        _ => {
            info!(redirect_url = %raw, "oauth.init.invalid_redirect");
            Err(GatewayError::InvalidInput("redirect_url must be an absolute http(s) URL".into()))
        }
    }
}

/// Append `params` to `target`, falling back to `fallback` when the stored
/// target is missing or unparseable.
fn redirect_with(target: Option<&str>, fallback: &str, params: &[(&str, &str)]) -> String {
    let base = target.and_then(|t| Url::parse(t).ok()).or_else(|| Url::parse(fallback).ok());
    match base {
        Some(mut url) => {
            url.query_pairs_mut().extend_pairs(params);
            url.into()
        }
        None => {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params)
                .finish();
            format!("{fallback}?{query}")
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
