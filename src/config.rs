// src/config.rs

use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    db::{CatalogRepository, OrdersRepository, SalesRepository, StatusRepository},
    services::{
        notification_service::NotificationService, order_service::OrderService,
        settlement_service::SettlementService, status_service::StatusService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub status_service: StatusService,
    pub order_service: OrderService,
    pub settlement_service: SettlementService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");

        // Flag de migração: enquanto houver leitores dos campos de texto
        // legados, toda gravação de itens reescreve `peca`/`servico`.
        let espelhar_texto_legado = env::var("LEGACY_TEXT_MIRROR")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let status_repo = StatusRepository::new(db_pool.clone());
        let orders_repo = OrdersRepository::new(db_pool.clone());
        let sales_repo = SalesRepository::new(db_pool.clone());
        let catalog_repo = CatalogRepository::new(db_pool.clone());

        let status_service = StatusService::new(status_repo.clone());
        let order_service = OrderService::new(
            db_pool.clone(),
            orders_repo.clone(),
            status_repo,
            catalog_repo.clone(),
            espelhar_texto_legado,
        );
        let settlement_service = SettlementService::new(
            db_pool.clone(),
            orders_repo,
            sales_repo,
            catalog_repo,
            order_service.clone(),
        );
        let notification_service = NotificationService::new(db_pool.clone());

        Ok(Self {
            db_pool,
            status_service,
            order_service,
            settlement_service,
            notification_service,
        })
    }
}
