// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Status ---
        handlers::status::list_status,
        handlers::status::create_status,
        handlers::status::update_status,
        handlers::status::delete_status,
        handlers::status::reorder_status,

        // --- Ordens ---
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::get_history,
        handlers::orders::apply_status,
        handlers::orders::apply_status_tecnico,
        handlers::orders::update_device,
        handlers::orders::add_item,
        handlers::orders::edit_item,
        handlers::orders::remove_item,
        handlers::orders::set_item_quantity,
        handlers::orders::update_desconto,
        handlers::orders::deliver,

        // --- Vendas ---
        handlers::sales::list_sales,
    ),
    components(
        schemas(
            // --- Status ---
            models::status::StatusDomain,
            models::status::StatusOrigin,
            models::status::StatusDefinition,
            handlers::status::CreateStatusPayload,
            handlers::status::UpdateStatusPayload,
            handlers::status::ReorderStatusPayload,

            // --- Ordens ---
            models::orders::ItemKind,
            models::orders::ServiceOrder,
            models::orders::OsItem,
            models::orders::StatusHistoryEntry,
            models::orders::OrderDetail,
            handlers::orders::CreateOrderPayload,
            handlers::orders::ApplyStatusPayload,
            handlers::orders::UpdateDevicePayload,
            handlers::orders::AddItemPayload,
            handlers::orders::EditItemPayload,
            handlers::orders::SetQuantityPayload,
            handlers::orders::DescontoPayload,
            handlers::orders::DeliverPayload,
            handlers::orders::DeliveryResponse,

            // --- Vendas ---
            models::sales::PaymentMethod,
            models::sales::Sale,

            // --- Colaboradores ---
            models::catalog::Cliente,
            models::catalog::Tecnico,
            models::catalog::TermoGarantia,
            models::catalog::CatalogoItem,
        )
    ),
    tags(
        (name = "Status", description = "Cadastro de status da OS e do técnico"),
        (name = "Ordens", description = "Ciclo de vida da ordem de serviço"),
        (name = "Vendas", description = "Vendas geradas na entrega")
    )
)]
pub struct ApiDoc;
