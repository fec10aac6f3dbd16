// ==============================================================================
// routes/graphql.rs - GraphQL Endpoints
// ==============================================================================
// Description: POST /api/graphql executor and the optional GraphiQL explorer
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use async_graphql::http::GraphiQLSource;
use axum::{
    extract::{OriginalUri, State},
    http::{header::USER_AGENT, HeaderMap, Method},
    response::Html,
    routing::{get, post},
    Json, Router,
};

use crate::graphql::{GraphQLContext, RequestInfo};
use crate::middleware::{AuthUser, Payload};
use crate::state::AppState;

/// Path the executor is mounted at
pub const GRAPHQL_ENDPOINT: &str = "/api/graphql";

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(execute))
}

pub fn docs_router() -> Router<AppState> {
    Router::new().route("/", get(graphiql))
}

/// Execute a GraphQL request with the caller's context attached
pub async fn execute(
    State(state): State<AppState>,
    user: AuthUser,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Payload(request): Payload<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let context = GraphQLContext {
        request: RequestInfo {
            method: method.to_string(),
            path: uri.path().to_string(),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        },
        user,
    };

    Json(state.schema().execute(request.data(context)).await)
}

/// GraphiQL explorer
pub async fn graphiql() -> Html<String> {
    Html(GraphiQLSource::build().endpoint(GRAPHQL_ENDPOINT).finish())
}
