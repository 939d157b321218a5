// src/db/catalog_repo.rs
//
// Consultas somente-leitura aos colaboradores de borda. O CRUD dessas
// tabelas pertence a outra parte do sistema.

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{CatalogoItem, Cliente, Tecnico, TermoGarantia},
};

#[derive(Clone)]
pub struct CatalogRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_cliente<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        cliente_id: Uuid,
    ) -> Result<Option<Cliente>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cliente = sqlx::query_as::<_, Cliente>(
            "SELECT * FROM clientes WHERE id = $1 AND empresa_id = $2",
        )
        .bind(cliente_id)
        .bind(empresa_id)
        .fetch_optional(executor)
        .await?;

        Ok(cliente)
    }

    pub async fn get_tecnico<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        tecnico_id: Uuid,
    ) -> Result<Option<Tecnico>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tecnico = sqlx::query_as::<_, Tecnico>(
            "SELECT * FROM tecnicos WHERE id = $1 AND empresa_id = $2",
        )
        .bind(tecnico_id)
        .bind(empresa_id)
        .fetch_optional(executor)
        .await?;

        Ok(tecnico)
    }

    pub async fn get_termo_garantia<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        termo_id: Uuid,
    ) -> Result<Option<TermoGarantia>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let termo = sqlx::query_as::<_, TermoGarantia>(
            "SELECT * FROM termos_garantia WHERE id = $1 AND empresa_id = $2",
        )
        .bind(termo_id)
        .bind(empresa_id)
        .fetch_optional(executor)
        .await?;

        Ok(termo)
    }

    pub async fn get_catalogo_item<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        item_id: Uuid,
    ) -> Result<Option<CatalogoItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, CatalogoItem>(
            "SELECT * FROM catalogo_itens WHERE id = $1 AND empresa_id = $2",
        )
        .bind(item_id)
        .bind(empresa_id)
        .fetch_optional(executor)
        .await?;

        Ok(item)
    }
}
