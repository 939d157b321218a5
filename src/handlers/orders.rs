// src/handlers/orders.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    db::orders_repo::DeviceFields,
    middleware::RequestContext,
    models::{
        orders::{ItemKind, OrderDetail, ServiceOrder, StatusHistoryEntry},
        sales::Sale,
    },
    services::order_service::NewOrderData,
};

// =============================================================================
//  ABERTURA E CONSULTA
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub cliente_id: Uuid,
    pub tecnico_id: Option<Uuid>,

    /// OS de retorno (aparelho voltou dentro da garantia)?
    #[serde(default)]
    pub retorno: bool,

    #[schema(example = "CELULAR")]
    pub categoria: Option<String>,
    #[schema(example = "SAMSUNG")]
    pub marca: Option<String>,
    #[schema(example = "GALAXY S22")]
    pub modelo: Option<String>,
    pub cor: Option<String>,
    pub numero_serie: Option<String>,
    pub acessorios: Option<String>,
    pub condicoes_equipamento: Option<String>,

    pub prazo_entrega: Option<NaiveDate>,

    #[serde(default)]
    pub imagens: Vec<String>,
}

// POST /api/ordens
#[utoipa::path(
    post,
    path = "/api/ordens",
    tag = "Ordens",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "OS aberta na primeira etapa do cadastro de status", body = ServiceOrder),
        (status = 404, description = "Cliente ou técnico não encontrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let data = NewOrderData {
        cliente_id: payload.cliente_id,
        tecnico_id: payload.tecnico_id,
        retorno: payload.retorno,
        device: DeviceFields {
            categoria: payload.categoria,
            marca: payload.marca,
            modelo: payload.modelo,
            cor: payload.cor,
            numero_serie: payload.numero_serie,
            acessorios: payload.acessorios,
            condicoes_equipamento: payload.condicoes_equipamento,
        },
        prazo_entrega: payload.prazo_entrega,
        imagens: payload.imagens,
    };

    let order = app_state.order_service.create_order(&ctx, data).await?;

    Ok((StatusCode::CREATED, Json(order)))
}

// GET /api/ordens/{id}
#[utoipa::path(
    get,
    path = "/api/ordens/{id}",
    tag = "Ordens",
    responses(
        (status = 200, description = "OS com itens e lista de imagens", body = OrderDetail),
        (status = 404, description = "OS não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    )
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(os_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.order_service.get_detail(&ctx, os_id).await?;
    Ok(Json(detail))
}

// GET /api/ordens/{id}/historico
#[utoipa::path(
    get,
    path = "/api/ordens/{id}/historico",
    tag = "Ordens",
    responses(
        (status = 200, description = "Linha do tempo de transições, da abertura em diante", body = [StatusHistoryEntry])
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    )
)]
pub async fn get_history(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(os_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let historico = app_state.order_service.history(&ctx, os_id).await?;
    Ok(Json(historico))
}

// =============================================================================
//  TRANSIÇÕES DE STATUS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyStatusPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "APROVADO")]
    pub status: String,
}

// POST /api/ordens/{id}/status
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/status",
    tag = "Ordens",
    request_body = ApplyStatusPayload,
    responses(
        (status = 200, description = "Status aplicado; status técnico derivado pela tabela de transição", body = ServiceOrder),
        (status = 400, description = "Status fora do cadastro da empresa"),
        (status = 409, description = "OS já entregue")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn apply_status(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(os_id): Path<Uuid>,
    Json(payload): Json<ApplyStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (order, event) = app_state
        .order_service
        .apply_status(&ctx, os_id, &payload.status)
        .await?;

    // A notificação é melhor-esforço: falha dela não desfaz a transição.
    app_state.notification_service.publish_transition(&event).await;

    Ok(Json(order))
}

// POST /api/ordens/{id}/status-tecnico
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/status-tecnico",
    tag = "Ordens",
    request_body = ApplyStatusPayload,
    responses(
        (status = 200, description = "Status técnico ajustado manualmente", body = ServiceOrder),
        (status = 400, description = "Status fora do cadastro da empresa"),
        (status = 409, description = "OS já entregue")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn apply_status_tecnico(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(os_id): Path<Uuid>,
    Json(payload): Json<ApplyStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (order, event) = app_state
        .order_service
        .apply_status_tecnico(&ctx, os_id, &payload.status)
        .await?;

    app_state.notification_service.publish_transition(&event).await;

    Ok(Json(order))
}

// =============================================================================
//  APARELHO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDevicePayload {
    pub tecnico_id: Option<Uuid>,
    pub categoria: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub cor: Option<String>,
    pub numero_serie: Option<String>,
    pub acessorios: Option<String>,
    pub condicoes_equipamento: Option<String>,
    pub prazo_entrega: Option<NaiveDate>,
    #[serde(default)]
    pub imagens: Vec<String>,
}

// PUT /api/ordens/{id}/aparelho
#[utoipa::path(
    put,
    path = "/api/ordens/{id}/aparelho",
    tag = "Ordens",
    request_body = UpdateDevicePayload,
    responses(
        (status = 200, description = "Dados do aparelho e atribuição atualizados", body = ServiceOrder),
        (status = 409, description = "OS já entregue")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn update_device(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(os_id): Path<Uuid>,
    Json(payload): Json<UpdateDevicePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let device = DeviceFields {
        categoria: payload.categoria,
        marca: payload.marca,
        modelo: payload.modelo,
        cor: payload.cor,
        numero_serie: payload.numero_serie,
        acessorios: payload.acessorios,
        condicoes_equipamento: payload.condicoes_equipamento,
    };

    let order = app_state
        .order_service
        .update_device(&ctx, os_id, payload.tecnico_id, device, payload.prazo_entrega, payload.imagens)
        .await?;

    Ok(Json(order))
}

// =============================================================================
//  ITENS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddItemPayload {
    /// Item do catálogo; nome/preço/tipo são resolvidos de lá.
    pub catalogo_id: Option<Uuid>,

    /// Para item avulso: tipo, nome e preço vêm no corpo.
    pub tipo: Option<ItemKind>,
    #[schema(example = "Película de vidro")]
    pub nome: Option<String>,
    #[schema(example = "25.00")]
    pub preco: Option<Decimal>,

    #[serde(default = "um")]
    #[schema(example = 1)]
    pub quantidade: i32,
}

fn um() -> i32 {
    1
}

// POST /api/ordens/{id}/itens
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/itens",
    tag = "Ordens",
    request_body = AddItemPayload,
    responses(
        (status = 200, description = "Item incluído; produto repetido soma quantidade", body = ServiceOrder),
        (status = 409, description = "OS já entregue")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn add_item(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(os_id): Path<Uuid>,
    Json(payload): Json<AddItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = match payload.catalogo_id {
        Some(catalogo_id) => {
            app_state
                .order_service
                .add_item_from_catalog(&ctx, os_id, catalogo_id, payload.quantidade)
                .await?
        }
        None => {
            let (Some(tipo), Some(nome), Some(preco)) =
                (payload.tipo, payload.nome.clone(), payload.preco)
            else {
                return Err(AppError::ValidationError(erro_item_avulso()));
            };
            app_state
                .order_service
                .add_item(&ctx, os_id, tipo, None, Some(nome), Some(preco), payload.quantidade)
                .await?
        }
    };

    Ok(Json(order))
}

fn erro_item_avulso() -> validator::ValidationErrors {
    let mut errors = validator::ValidationErrors::new();
    let mut err = validator::ValidationError::new("invalid");
    err.message = Some(std::borrow::Cow::Borrowed(
        "Informe catalogoId ou o conjunto tipo + nome + preco.",
    ));
    errors.add("catalogoId".into(), err);
    errors
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditItemPayload {
    #[validate(length(min = 1, message = "required"))]
    pub nome: String,
    pub preco: Decimal,
    pub quantidade: i32,
}

// PUT /api/ordens/{id}/itens/{item_id}
#[utoipa::path(
    put,
    path = "/api/ordens/{id}/itens/{item_id}",
    tag = "Ordens",
    request_body = EditItemPayload,
    responses(
        (status = 200, description = "Item editado (quantidade ≤ 0 remove)", body = ServiceOrder),
        (status = 404, description = "Item não encontrado na OS")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("item_id" = Uuid, Path, description = "ID do item"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn edit_item(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path((os_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<EditItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let order = app_state
        .order_service
        .edit_item(&ctx, os_id, item_id, payload.nome, payload.preco, payload.quantidade)
        .await?;

    Ok(Json(order))
}

// DELETE /api/ordens/{id}/itens/{item_id}
#[utoipa::path(
    delete,
    path = "/api/ordens/{id}/itens/{item_id}",
    tag = "Ordens",
    responses(
        (status = 200, description = "Item removido; agregados recalculados", body = ServiceOrder),
        (status = 404, description = "Item não encontrado na OS")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("item_id" = Uuid, Path, description = "ID do item"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn remove_item(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path((os_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state.order_service.remove_item(&ctx, os_id, item_id).await?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityPayload {
    #[schema(example = 2)]
    pub quantidade: i32,
}

// PUT /api/ordens/{id}/itens/{item_id}/quantidade
#[utoipa::path(
    put,
    path = "/api/ordens/{id}/itens/{item_id}/quantidade",
    tag = "Ordens",
    request_body = SetQuantityPayload,
    responses(
        (status = 200, description = "Quantidade ajustada (≤ 0 remove o item)", body = ServiceOrder)
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("item_id" = Uuid, Path, description = "ID do item"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn set_item_quantity(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path((os_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<SetQuantityPayload>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state
        .order_service
        .set_item_quantity(&ctx, os_id, item_id, payload.quantidade)
        .await?;

    Ok(Json(order))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DescontoPayload {
    #[schema(example = "30.00")]
    pub desconto: Decimal,
}

// PUT /api/ordens/{id}/desconto
#[utoipa::path(
    put,
    path = "/api/ordens/{id}/desconto",
    tag = "Ordens",
    request_body = DescontoPayload,
    responses(
        (status = 200, description = "Desconto aplicado; valor faturado recalculado", body = ServiceOrder)
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn update_desconto(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(os_id): Path<Uuid>,
    Json(payload): Json<DescontoPayload>,
) -> Result<impl IntoResponse, AppError> {
    let order = app_state
        .order_service
        .update_desconto(&ctx, os_id, payload.desconto)
        .await?;

    Ok(Json(order))
}

// =============================================================================
//  ENTREGA
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliverPayload {
    pub termo_garantia_id: Uuid,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "pix")]
    pub forma_pagamento: String,

    #[schema(example = "200.00")]
    pub valor_recebido: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
    pub ordem: ServiceOrder,
    pub venda: Option<Sale>,
}

// POST /api/ordens/{id}/entrega
#[utoipa::path(
    post,
    path = "/api/ordens/{id}/entrega",
    tag = "Ordens",
    request_body = DeliverPayload,
    responses(
        (status = 200, description = "OS entregue: garantia atribuída e venda criada na mesma transação", body = DeliveryResponse),
        (status = 400, description = "Termo ausente, pagamento inválido ou valor insuficiente"),
        (status = 409, description = "OS já entregue")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da OS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa"),
        ("x-usuario" = String, Header, description = "Usuário responsável")
    )
)]
pub async fn deliver(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(os_id): Path<Uuid>,
    Json(payload): Json<DeliverPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let receipt = app_state
        .settlement_service
        .deliver(
            &ctx,
            os_id,
            payload.termo_garantia_id,
            &payload.forma_pagamento,
            payload.valor_recebido,
        )
        .await?;

    app_state
        .notification_service
        .publish_transition(&receipt.event)
        .await;

    Ok(Json(DeliveryResponse {
        ordem: receipt.ordem,
        venda: receipt.venda,
    }))
}
