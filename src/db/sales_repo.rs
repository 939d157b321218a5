// src/db/sales_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::sales::Sale};

#[derive(Clone)]
pub struct SalesRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl SalesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Próximo número de venda da empresa. O UPSERT incrementa o contador
    /// de forma atômica dentro da MESMA transação do INSERT da venda;
    /// nunca "lê o máximo e soma um".
    pub async fn next_sale_number<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let numero = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO venda_contadores (empresa_id, ultimo_numero)
            VALUES ($1, 1)
            ON CONFLICT (empresa_id)
            DO UPDATE SET ultimo_numero = venda_contadores.ultimo_numero + 1
            RETURNING ultimo_numero
            "#,
        )
        .bind(empresa_id)
        .fetch_one(executor)
        .await?;

        Ok(numero)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        numero_venda: i64,
        cliente_id: Option<Uuid>,
        total: Decimal,
        forma_pagamento: &str,
        observacoes: &str,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO vendas (
                empresa_id, numero_venda, cliente_id, total,
                forma_pagamento, status, observacoes
            )
            VALUES ($1, $2, $3, $4, $5, 'finalizada', $6)
            RETURNING *
            "#,
        )
        .bind(empresa_id)
        .bind(numero_venda)
        .bind(cliente_id)
        .bind(total)
        .bind(forma_pagamento)
        .bind(observacoes)
        .fetch_one(executor)
        .await?;

        Ok(sale)
    }

    pub async fn list<'e, E>(&self, executor: E, empresa_id: Uuid) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM vendas WHERE empresa_id = $1 ORDER BY numero_venda DESC",
        )
        .bind(empresa_id)
        .fetch_all(executor)
        .await?;

        Ok(sales)
    }
}
