// ==============================================================================
// graphql/mod.rs - GraphQL Schema
// ==============================================================================
// Description: Query/mutation roots over the payment gateway, executed with a
//              per-request {request, user} context
// Created: 2026-10-18
// Modified: 2026-10-18
// Version: 1.0.0
// ==============================================================================

use async_graphql::{
    Context, EmptySubscription, Error, ErrorExtensions, Object, Result, Schema, SimpleObject,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::payments::{Charge, NewCharge, PaymentGateway};

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema; the payment gateway is shared schema data
pub fn build_schema(payments: Arc<dyn PaymentGateway>) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(payments)
        .finish()
}

// ==============================================================================
// REQUEST CONTEXT
// ==============================================================================

/// Slice of the HTTP request visible to resolvers
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub user_agent: Option<String>,
}

/// Attached to every GraphQL execution
#[derive(Debug, Clone)]
pub struct GraphQLContext {
    pub request: RequestInfo,
    pub user: AuthUser,
}

/// The authenticated caller
#[derive(Debug, Clone, SimpleObject)]
pub struct Viewer {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<&AuthUser> for Viewer {
    fn from(user: &AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Report an `AppError` through GraphQL `errors[].extensions.code`
fn to_graphql_error(err: AppError) -> Error {
    let details = err.details();
    let code = details
        .first()
        .map(|d| d.code.clone())
        .unwrap_or_else(|| "INTERNAL_ERROR".to_string());
    let message = details
        .iter()
        .map(|d| d.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    let status = err.status().as_u16();

    Error::new(message).extend_with(|_, e| {
        e.set("code", code);
        e.set("statusCode", status.to_string());
    })
}

fn payments<'a>(ctx: &Context<'a>) -> Result<&'a Arc<dyn PaymentGateway>> {
    ctx.data::<Arc<dyn PaymentGateway>>()
}

// ==============================================================================
// ROOTS
// ==============================================================================

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The user the bearer token belongs to
    async fn viewer(&self, ctx: &Context<'_>) -> Result<Viewer> {
        let context = ctx.data::<GraphQLContext>()?;
        Ok(Viewer::from(&context.user))
    }

    /// Charges created by the viewer, oldest first
    async fn charges(&self, ctx: &Context<'_>) -> Result<Vec<Charge>> {
        let context = ctx.data::<GraphQLContext>()?;
        Ok(payments(ctx)?.list_charges(context.user.id).await)
    }

    /// One of the viewer's charges
    async fn charge(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<Charge>> {
        let context = ctx.data::<GraphQLContext>()?;
        Ok(payments(ctx)?.find_charge(context.user.id, id).await.ok())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Create and settle a charge for the viewer
    async fn create_charge(&self, ctx: &Context<'_>, input: NewCharge) -> Result<Charge> {
        let context = ctx.data::<GraphQLContext>()?;

        input
            .validate()
            .map_err(|e| to_graphql_error(AppError::from(e)))?;

        let charge = payments(ctx)?
            .create_charge(context.user.id, input)
            .await
            .map_err(|e| to_graphql_error(AppError::from(e)))?;

        info!(
            charge_id = %charge.id,
            user_id = %context.user.id,
            path = %context.request.path,
            "charge created via GraphQL"
        );

        Ok(charge)
    }
}
