// src/db/status_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::status::{StatusDomain, StatusRow},
};

#[derive(Clone)]
pub struct StatusRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl StatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cadastro combinado (fixos do sistema + personalizados da empresa),
    /// num único espaço de ordenação.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        dominio: StatusDomain,
    ) -> Result<Vec<StatusRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, StatusRow>(
            r#"
            SELECT id, nome, cor, ordem, tipo, TRUE AS fixo
            FROM status_fixo
            WHERE tipo = $2
            UNION ALL
            SELECT id, nome, cor, ordem, tipo, FALSE AS fixo
            FROM status_personalizado
            WHERE empresa_id = $1 AND tipo = $2
            ORDER BY ordem ASC, fixo DESC
            "#,
        )
        .bind(empresa_id)
        .bind(dominio.as_db())
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }

    /// Cria um status personalizado no fim do espaço de ordenação combinado.
    pub async fn create_custom<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        dominio: StatusDomain,
        nome: &str,
        cor: &str,
    ) -> Result<StatusRow, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // A subquery pega a próxima posição livre considerando os dois cadastros.
        let row = sqlx::query_as::<_, StatusRow>(
            r#"
            INSERT INTO status_personalizado (empresa_id, nome, cor, ordem, tipo)
            VALUES (
                $1, $2, $3,
                (
                    SELECT COALESCE(MAX(ordem), -1) + 1 FROM (
                        SELECT ordem FROM status_fixo WHERE tipo = $4
                        UNION ALL
                        SELECT ordem FROM status_personalizado
                        WHERE empresa_id = $1 AND tipo = $4
                    ) AS combinado
                ),
                $4
            )
            RETURNING id, nome, cor, ordem, tipo, FALSE AS fixo
            "#,
        )
        .bind(empresa_id)
        .bind(nome)
        .bind(cor)
        .bind(dominio.as_db())
        .fetch_one(executor)
        .await?;

        Ok(row)
    }

    /// O id pertence ao cadastro fixo?
    pub async fn is_fixed<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let nome = sqlx::query_scalar::<_, String>("SELECT nome FROM status_fixo WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(nome)
    }

    pub async fn update_custom<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        id: Uuid,
        nome: &str,
        cor: &str,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE status_personalizado SET nome = $1, cor = $2 WHERE id = $3 AND empresa_id = $4",
        )
        .bind(nome)
        .bind(cor)
        .bind(id)
        .bind(empresa_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_custom<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result =
            sqlx::query("DELETE FROM status_personalizado WHERE id = $1 AND empresa_id = $2")
                .bind(id)
                .bind(empresa_id)
                .execute(executor)
                .await?;

        Ok(result.rows_affected())
    }

    // As duas escritas de ordinal abaixo são sempre chamadas dentro de UMA
    // transação aberta pelo serviço: a reordenação é tudo-ou-nada.

    pub async fn set_ordem_fixo<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        dominio: StatusDomain,
        ordem: i32,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE status_fixo SET ordem = $1 WHERE id = $2 AND tipo = $3")
            .bind(ordem)
            .bind(id)
            .bind(dominio.as_db())
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn set_ordem_personalizado<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        id: Uuid,
        dominio: StatusDomain,
        ordem: i32,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE status_personalizado SET ordem = $1
            WHERE id = $2 AND empresa_id = $3 AND tipo = $4
            "#,
        )
        .bind(ordem)
        .bind(id)
        .bind(empresa_id)
        .bind(dominio.as_db())
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
