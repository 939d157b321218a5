// src/db/orders_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::orders::{OsItem, ServiceOrder, StatusHistoryEntry},
};

/// Campos do aparelho editáveis após a abertura (opacos para o núcleo).
#[derive(Debug, Clone, Default)]
pub struct DeviceFields {
    pub categoria: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub cor: Option<String>,
    pub numero_serie: Option<String>,
    pub acessorios: Option<String>,
    pub condicoes_equipamento: Option<String>,
}

#[derive(Clone)]
pub struct OrdersRepository {
    #[allow(dead_code)]
    pool: PgPool,
}

impl OrdersRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Próximo número de OS da empresa. Incremento atômico via UPSERT:
    /// chamadas concorrentes nunca recebem o mesmo número.
    pub async fn next_os_number<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let numero = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO os_contadores (empresa_id, ultimo_numero)
            VALUES ($1, 1)
            ON CONFLICT (empresa_id)
            DO UPDATE SET ultimo_numero = os_contadores.ultimo_numero + 1
            RETURNING ultimo_numero
            "#,
        )
        .bind(empresa_id)
        .fetch_one(executor)
        .await?;

        Ok(numero)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_order<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        numero_os: i64,
        cliente_id: Uuid,
        tecnico_id: Option<Uuid>,
        status: &str,
        status_tecnico: &str,
        retorno: bool,
        device: &DeviceFields,
        prazo_entrega: Option<NaiveDate>,
        imagens: Option<&str>,
    ) -> Result<ServiceOrder, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ServiceOrder>(
            r#"
            INSERT INTO ordens_servico (
                empresa_id, numero_os, cliente_id, tecnico_id,
                status, status_tecnico, retorno,
                categoria, marca, modelo, cor, numero_serie,
                acessorios, condicoes_equipamento,
                prazo_entrega, imagens
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(empresa_id)
        .bind(numero_os)
        .bind(cliente_id)
        .bind(tecnico_id)
        .bind(status)
        .bind(status_tecnico)
        .bind(retorno)
        .bind(&device.categoria)
        .bind(&device.marca)
        .bind(&device.modelo)
        .bind(&device.cor)
        .bind(&device.numero_serie)
        .bind(&device.acessorios)
        .bind(&device.condicoes_equipamento)
        .bind(prazo_entrega)
        .bind(imagens)
        .fetch_one(executor)
        .await?;

        Ok(order)
    }

    pub async fn get<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
    ) -> Result<Option<ServiceOrder>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let order = sqlx::query_as::<_, ServiceOrder>(
            "SELECT * FROM ordens_servico WHERE id = $1 AND empresa_id = $2",
        )
        .bind(os_id)
        .bind(empresa_id)
        .fetch_optional(executor)
        .await?;

        Ok(order)
    }

    /// Atualiza os dois status com verificação otimista de versão.
    /// Retorna 0 linhas quando a versão lida ficou para trás.
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
        status: &str,
        status_tecnico: &str,
        versao_lida: i64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE ordens_servico
            SET status = $1, status_tecnico = $2, versao = versao + 1
            WHERE id = $3 AND empresa_id = $4 AND versao = $5
            "#,
        )
        .bind(status)
        .bind(status_tecnico)
        .bind(os_id)
        .bind(empresa_id)
        .bind(versao_lida)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Marca a liquidação da entrega: datas, termo, valor faturado final e
    /// congelamento.
    #[allow(clippy::too_many_arguments)]
    pub async fn set_entrega<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
        termo_garantia_id: Uuid,
        data_entrega: NaiveDate,
        vencimento_garantia: NaiveDate,
        valor_faturado: Decimal,
        versao_lida: i64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE ordens_servico
            SET termo_garantia_id = $1,
                data_entrega = $2,
                vencimento_garantia = $3,
                valor_faturado = $4,
                versao = versao + 1
            WHERE id = $5 AND empresa_id = $6 AND versao = $7 AND data_entrega IS NULL
            "#,
        )
        .bind(termo_garantia_id)
        .bind(data_entrega)
        .bind(vencimento_garantia)
        .bind(valor_faturado)
        .bind(os_id)
        .bind(empresa_id)
        .bind(versao_lida)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_device<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
        tecnico_id: Option<Uuid>,
        device: &DeviceFields,
        prazo_entrega: Option<NaiveDate>,
        imagens: Option<&str>,
        versao_lida: i64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE ordens_servico
            SET tecnico_id = $1,
                categoria = $2, marca = $3, modelo = $4, cor = $5,
                numero_serie = $6, acessorios = $7, condicoes_equipamento = $8,
                prazo_entrega = $9, imagens = $10,
                versao = versao + 1
            WHERE id = $11 AND empresa_id = $12 AND versao = $13
            "#,
        )
        .bind(tecnico_id)
        .bind(&device.categoria)
        .bind(&device.marca)
        .bind(&device.modelo)
        .bind(&device.cor)
        .bind(&device.numero_serie)
        .bind(&device.acessorios)
        .bind(&device.condicoes_equipamento)
        .bind(prazo_entrega)
        .bind(imagens)
        .bind(os_id)
        .bind(empresa_id)
        .bind(versao_lida)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Regrava os agregados em cache e os espelhos legados em texto.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_totais<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
        valor_peca: Decimal,
        valor_servico: Decimal,
        desconto: Decimal,
        valor_faturado: Decimal,
        peca: Option<&str>,
        servico: Option<&str>,
        versao_lida: i64,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // qtd_peca/qtd_servico voltam a 1: o total já está agregado nos itens.
        let result = sqlx::query(
            r#"
            UPDATE ordens_servico
            SET valor_peca = $1, qtd_peca = 1,
                valor_servico = $2, qtd_servico = 1,
                desconto = $3, valor_faturado = $4,
                peca = COALESCE($5, peca),
                servico = COALESCE($6, servico),
                versao = versao + 1
            WHERE id = $7 AND empresa_id = $8 AND versao = $9
            "#,
        )
        .bind(valor_peca)
        .bind(valor_servico)
        .bind(desconto)
        .bind(valor_faturado)
        .bind(peca)
        .bind(servico)
        .bind(os_id)
        .bind(empresa_id)
        .bind(versao_lida)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    //  ITENS ESTRUTURADOS
    // =========================================================================

    pub async fn list_itens<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
    ) -> Result<Vec<OsItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let itens = sqlx::query_as::<_, OsItem>(
            r#"
            SELECT * FROM os_itens
            WHERE empresa_id = $1 AND os_id = $2
            ORDER BY criado_em ASC
            "#,
        )
        .bind(empresa_id)
        .bind(os_id)
        .fetch_all(executor)
        .await?;

        Ok(itens)
    }

    pub async fn delete_itens<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM os_itens WHERE empresa_id = $1 AND os_id = $2")
            .bind(empresa_id)
            .bind(os_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_item<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
        item_id: Uuid,
        tipo: &str,
        catalogo_id: Option<Uuid>,
        nome: &str,
        preco: Decimal,
        quantidade: i32,
    ) -> Result<OsItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let item = sqlx::query_as::<_, OsItem>(
            r#"
            INSERT INTO os_itens (id, empresa_id, os_id, tipo, catalogo_id, nome, preco, quantidade)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(item_id)
        .bind(empresa_id)
        .bind(os_id)
        .bind(tipo)
        .bind(catalogo_id)
        .bind(nome)
        .bind(preco)
        .bind(quantidade)
        .fetch_one(executor)
        .await?;

        Ok(item)
    }

    // =========================================================================
    //  HISTÓRICO (somente inserção)
    // =========================================================================

    pub async fn append_history<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
        status: &str,
        status_tecnico: &str,
        usuario: &str,
    ) -> Result<StatusHistoryEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            INSERT INTO historico_status (empresa_id, os_id, status, status_tecnico, usuario)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(empresa_id)
        .bind(os_id)
        .bind(status)
        .bind(status_tecnico)
        .bind(usuario)
        .fetch_one(executor)
        .await?;

        Ok(entry)
    }

    pub async fn list_history<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        os_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, StatusHistoryEntry>(
            r#"
            SELECT * FROM historico_status
            WHERE empresa_id = $1 AND os_id = $2
            ORDER BY criado_em ASC
            "#,
        )
        .bind(empresa_id)
        .bind(os_id)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }
}
