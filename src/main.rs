//src/main.rs

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() {
    // Inicializa o logger.
    tracing_subscriber::fmt().with_target(false).compact().init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // Roda as migrações do SQLx na inicialização
    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Cadastro de status (fixos + personalizados) por domínio
    let status_routes = Router::new()
        .route(
            "/{dominio}",
            get(handlers::status::list_status).post(handlers::status::create_status),
        )
        .route("/{dominio}/reordenar", put(handlers::status::reorder_status))
        .route(
            "/{dominio}/{id}",
            put(handlers::status::update_status).delete(handlers::status::delete_status),
        );

    // Ciclo de vida da OS: abertura, transições, itens e entrega
    let ordens_routes = Router::new()
        .route("/", post(handlers::orders::create_order))
        .route("/{id}", get(handlers::orders::get_order))
        .route("/{id}/historico", get(handlers::orders::get_history))
        .route("/{id}/status", post(handlers::orders::apply_status))
        .route("/{id}/status-tecnico", post(handlers::orders::apply_status_tecnico))
        .route("/{id}/aparelho", put(handlers::orders::update_device))
        .route("/{id}/desconto", put(handlers::orders::update_desconto))
        .route("/{id}/itens", post(handlers::orders::add_item))
        .route(
            "/{id}/itens/{item_id}",
            put(handlers::orders::edit_item).delete(handlers::orders::remove_item),
        )
        .route(
            "/{id}/itens/{item_id}/quantidade",
            put(handlers::orders::set_item_quantity),
        )
        .route("/{id}/entrega", post(handlers::orders::deliver));

    let vendas_routes = Router::new().route("/", get(handlers::sales::list_sales));

    // Combina tudo no router principal
    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/status", status_routes)
        .nest("/api/ordens", ordens_routes)
        .nest("/api/vendas", vendas_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.expect("Erro no servidor Axum");
}
