// src/handlers/sales.rs

use axum::{Json, extract::State, response::IntoResponse};
use uuid::Uuid;

use crate::{
    common::error::AppError, config::AppState, middleware::RequestContext, models::sales::Sale,
};

// GET /api/vendas
#[utoipa::path(
    get,
    path = "/api/vendas",
    tag = "Vendas",
    responses(
        (status = 200, description = "Vendas da empresa, da mais recente para a mais antiga", body = [Sale])
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    )
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    ctx: RequestContext,
) -> Result<impl IntoResponse, AppError> {
    let vendas = app_state.settlement_service.list_sales(&ctx).await?;
    Ok(Json(vendas))
}
