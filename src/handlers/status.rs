// src/handlers/status.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::RequestContext,
    models::status::{StatusDefinition, StatusDomain},
};

// GET /api/status/{dominio}
#[utoipa::path(
    get,
    path = "/api/status/{dominio}",
    tag = "Status",
    responses(
        (status = 200, description = "Cadastro combinado (fixos + personalizados), na ordem configurada", body = [StatusDefinition])
    ),
    params(
        ("dominio" = StatusDomain, Path, description = "os | tecnico"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    )
)]
pub async fn list_status(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(dominio): Path<StatusDomain>,
) -> Result<impl IntoResponse, AppError> {
    let status = app_state
        .status_service
        .list(&app_state.db_pool, ctx.empresa_id, dominio)
        .await?;

    Ok(Json(status))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatusPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "AGUARDANDO FORNECEDOR")]
    pub nome: String,

    #[serde(default = "cor_padrao")]
    #[schema(example = "#f97316")]
    pub cor: String,
}

fn cor_padrao() -> String {
    "#6b7280".to_string()
}

// POST /api/status/{dominio}
#[utoipa::path(
    post,
    path = "/api/status/{dominio}",
    tag = "Status",
    request_body = CreateStatusPayload,
    responses(
        (status = 201, description = "Status personalizado criado no fim da ordenação", body = StatusDefinition)
    ),
    params(
        ("dominio" = StatusDomain, Path, description = "os | tecnico"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    )
)]
pub async fn create_status(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(dominio): Path<StatusDomain>,
    Json(payload): Json<CreateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let status = app_state
        .status_service
        .create(&app_state.db_pool, ctx.empresa_id, dominio, &payload.nome, &payload.cor)
        .await?;

    Ok((StatusCode::CREATED, Json(status)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusPayload {
    #[validate(length(min = 1, message = "required"))]
    pub nome: String,

    #[serde(default = "cor_padrao")]
    pub cor: String,
}

// PUT /api/status/{dominio}/{id}
#[utoipa::path(
    put,
    path = "/api/status/{dominio}/{id}",
    tag = "Status",
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status personalizado atualizado"),
        (status = 409, description = "Status fixo do sistema não pode ser alterado")
    ),
    params(
        ("dominio" = StatusDomain, Path, description = "os | tecnico"),
        ("id" = Uuid, Path, description = "ID do status"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    )
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path((_dominio, id)): Path<(StatusDomain, Uuid)>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state
        .status_service
        .update(&app_state.db_pool, ctx.empresa_id, id, &payload.nome, &payload.cor)
        .await?;

    Ok(StatusCode::OK)
}

// DELETE /api/status/{dominio}/{id}
#[utoipa::path(
    delete,
    path = "/api/status/{dominio}/{id}",
    tag = "Status",
    responses(
        (status = 204, description = "Status personalizado removido"),
        (status = 409, description = "Status fixo do sistema não pode ser removido")
    ),
    params(
        ("dominio" = StatusDomain, Path, description = "os | tecnico"),
        ("id" = Uuid, Path, description = "ID do status"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    )
)]
pub async fn delete_status(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path((_dominio, id)): Path<(StatusDomain, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .status_service
        .delete(&app_state.db_pool, ctx.empresa_id, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderStatusPayload {
    /// Todos os ids do domínio, na nova ordem.
    #[validate(length(min = 1, message = "required"))]
    pub ids: Vec<Uuid>,
}

// PUT /api/status/{dominio}/reordenar
#[utoipa::path(
    put,
    path = "/api/status/{dominio}/reordenar",
    tag = "Status",
    request_body = ReorderStatusPayload,
    responses(
        (status = 200, description = "Ordenação regravada por inteiro (tudo-ou-nada)", body = [StatusDefinition])
    ),
    params(
        ("dominio" = StatusDomain, Path, description = "os | tecnico"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    )
)]
pub async fn reorder_status(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(dominio): Path<StatusDomain>,
    Json(payload): Json<ReorderStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let status = app_state
        .status_service
        .reorder(&app_state.db_pool, ctx.empresa_id, dominio, &payload.ids)
        .await?;

    Ok(Json(status))
}
