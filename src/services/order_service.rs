// src/services/order_service.rs
//
// Máquina de estados da OS: abertura, transições de status (com derivação do
// status técnico), edições de aparelho e operações sobre o livro de itens.
// Toda escrita passa pela verificação otimista de versão da OS; escrita que
// perder a corrida é retentada um número limitado de vezes.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{error::AppError, normalize::status_eq},
    db::{CatalogRepository, OrdersRepository, StatusRepository, orders_repo::DeviceFields},
    middleware::RequestContext,
    models::{
        orders::{ItemKind, OrderDetail, ServiceOrder, StatusHistoryEntry, TransitionEvent, join_imagens},
        status::StatusDomain,
    },
    services::ledger::{ItemLedger, LedgerItem, LegacyAggregates},
};

// Tentativas para escritas que perderem a corrida de versão.
const MAX_TENTATIVAS: u32 = 3;

/// Status técnico forçado por um status de OS, quando houver.
///
/// Qualquer outro valor deixa o status técnico como está: ajustes manuais do
/// técnico só são sobrescritos pelos três mapeamentos abaixo.
pub fn forced_status_tecnico(novo_status: &str) -> Option<&'static str> {
    if status_eq(novo_status, "APROVADO") {
        Some("APROVADO")
    } else if status_eq(novo_status, "ENTREGUE") {
        Some("FINALIZADA")
    } else if status_eq(novo_status, "AGUARDANDO APROVACAO") {
        Some("AGUARDANDO APROVAÇÃO")
    } else {
        None
    }
}

/// Resultado de uma transição aplicada dentro de uma transação.
pub struct AppliedStatus {
    pub status: String,
    pub status_tecnico: String,
    /// Versão da OS após a escrita (para quem continua na mesma transação).
    pub versao: i64,
    pub event: TransitionEvent,
}

/// Dados de abertura de uma OS.
#[derive(Debug, Clone, Default)]
pub struct NewOrderData {
    pub cliente_id: Uuid,
    pub tecnico_id: Option<Uuid>,
    pub retorno: bool,
    pub device: DeviceFields,
    pub prazo_entrega: Option<NaiveDate>,
    pub imagens: Vec<String>,
}

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    orders_repo: OrdersRepository,
    status_repo: StatusRepository,
    catalog_repo: CatalogRepository,
    // Flag de migração: enquanto ligada, toda gravação de itens reescreve os
    // espelhos legados `peca`/`servico`.
    espelhar_texto_legado: bool,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        orders_repo: OrdersRepository,
        status_repo: StatusRepository,
        catalog_repo: CatalogRepository,
        espelhar_texto_legado: bool,
    ) -> Self {
        Self {
            pool,
            orders_repo,
            status_repo,
            catalog_repo,
            espelhar_texto_legado,
        }
    }

    // =========================================================================
    //  ABERTURA
    // =========================================================================

    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        data: NewOrderData,
    ) -> Result<ServiceOrder, AppError> {
        let mut tx = self.pool.begin().await?;

        self.catalog_repo
            .get_cliente(&mut *tx, ctx.empresa_id, data.cliente_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Cliente".to_string()))?;

        if let Some(tecnico_id) = data.tecnico_id {
            self.catalog_repo
                .get_tecnico(&mut *tx, ctx.empresa_id, tecnico_id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("Técnico".to_string()))?;
        }

        // A OS nasce na primeira etapa do cadastro da empresa.
        let registro = self
            .status_repo
            .list(&mut *tx, ctx.empresa_id, StatusDomain::Os)
            .await?;
        let status_inicial = registro
            .first()
            .map(|s| s.nome.clone())
            .unwrap_or_else(|| "ABERTA".to_string());

        let numero_os = self.orders_repo.next_os_number(&mut *tx, ctx.empresa_id).await?;

        let imagens = join_imagens(&data.imagens);
        let order = self
            .orders_repo
            .insert_order(
                &mut *tx,
                ctx.empresa_id,
                numero_os,
                data.cliente_id,
                data.tecnico_id,
                &status_inicial,
                "AGUARDANDO INÍCIO",
                data.retorno,
                &data.device,
                data.prazo_entrega,
                if imagens.is_empty() { None } else { Some(imagens.as_str()) },
            )
            .await?;

        // O estado de abertura também entra na linha do tempo.
        self.orders_repo
            .append_history(
                &mut *tx,
                ctx.empresa_id,
                order.id,
                &order.status,
                &order.status_tecnico,
                &ctx.usuario,
            )
            .await?;

        tx.commit().await?;
        Ok(order)
    }

    // =========================================================================
    //  CONSULTA
    // =========================================================================

    pub async fn get_detail(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
    ) -> Result<OrderDetail, AppError> {
        let order = self
            .orders_repo
            .get(&self.pool, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))?;

        let cliente = self
            .catalog_repo
            .get_cliente(&self.pool, ctx.empresa_id, order.cliente_id)
            .await?;
        let itens = self
            .orders_repo
            .list_itens(&self.pool, ctx.empresa_id, os_id)
            .await?;

        let imagens_lista = order.lista_imagens();
        Ok(OrderDetail {
            header: order,
            cliente_nome: cliente.map(|c| c.nome),
            itens,
            imagens_lista,
        })
    }

    pub async fn history(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
    ) -> Result<Vec<StatusHistoryEntry>, AppError> {
        self.orders_repo
            .get(&self.pool, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))?;

        self.orders_repo
            .list_history(&self.pool, ctx.empresa_id, os_id)
            .await
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    /// Núcleo da máquina de estados, executado dentro de uma transação já
    /// aberta (a liquidação de entrega reusa este caminho, nunca o duplica).
    pub async fn apply_status_on(
        &self,
        conn: &mut PgConnection,
        ctx: &RequestContext,
        order: &ServiceOrder,
        novo_status: &str,
    ) -> Result<AppliedStatus, AppError> {
        if order.entregue() {
            return Err(AppError::OrderAlreadyDelivered);
        }

        // O nome persiste exatamente como cadastrado; a comparação é normalizada.
        let registro = self
            .status_repo
            .list(&mut *conn, ctx.empresa_id, StatusDomain::Os)
            .await?;
        let definicao = registro
            .iter()
            .find(|s| status_eq(&s.nome, novo_status))
            .ok_or_else(|| AppError::UnknownStatus(novo_status.to_string()))?;

        let status = definicao.nome.clone();
        let status_tecnico = match forced_status_tecnico(&status) {
            Some(forcado) => forcado.to_string(),
            None => order.status_tecnico.clone(),
        };

        let alteradas = self
            .orders_repo
            .update_status(
                &mut *conn,
                ctx.empresa_id,
                order.id,
                &status,
                &status_tecnico,
                order.versao,
            )
            .await?;
        if alteradas == 0 {
            return Err(AppError::StaleVersion);
        }

        self.orders_repo
            .append_history(&mut *conn, ctx.empresa_id, order.id, &status, &status_tecnico, &ctx.usuario)
            .await?;

        let event = TransitionEvent {
            empresa_id: ctx.empresa_id,
            os_id: order.id,
            numero_os: order.numero_os,
            de: order.status.clone(),
            para: status.clone(),
            usuario: ctx.usuario.clone(),
            quando: Utc::now(),
        };

        Ok(AppliedStatus {
            status,
            status_tecnico,
            versao: order.versao + 1,
            event,
        })
    }

    /// Aplica um status de OS, derivando o status técnico pela tabela de
    /// transição e registrando a trilha. Retorna o evento para publicação
    /// após o commit.
    pub async fn apply_status(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        novo_status: &str,
    ) -> Result<(ServiceOrder, TransitionEvent), AppError> {
        for tentativa in 1..=MAX_TENTATIVAS {
            match self.try_apply_status(ctx, os_id, novo_status).await {
                Err(AppError::StaleVersion) if tentativa < MAX_TENTATIVAS => continue,
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    async fn try_apply_status(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        novo_status: &str,
    ) -> Result<(ServiceOrder, TransitionEvent), AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self
            .orders_repo
            .get(&mut *tx, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))?;

        let aplicado = self.apply_status_on(&mut *tx, ctx, &order, novo_status).await?;

        tx.commit().await?;

        let mut atualizado = order;
        atualizado.status = aplicado.status;
        atualizado.status_tecnico = aplicado.status_tecnico;
        atualizado.versao = aplicado.versao;

        Ok((atualizado, aplicado.event))
    }

    /// Edição manual do status técnico, independente do status da OS.
    /// Também é validada contra o cadastro e registrada na trilha.
    pub async fn apply_status_tecnico(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        novo_status: &str,
    ) -> Result<(ServiceOrder, TransitionEvent), AppError> {
        for tentativa in 1..=MAX_TENTATIVAS {
            match self.try_apply_status_tecnico(ctx, os_id, novo_status).await {
                Err(AppError::StaleVersion) if tentativa < MAX_TENTATIVAS => continue,
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    async fn try_apply_status_tecnico(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        novo_status: &str,
    ) -> Result<(ServiceOrder, TransitionEvent), AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self
            .orders_repo
            .get(&mut *tx, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))?;
        if order.entregue() {
            return Err(AppError::OrderAlreadyDelivered);
        }

        let registro = self
            .status_repo
            .list(&mut *tx, ctx.empresa_id, StatusDomain::Tecnico)
            .await?;
        let definicao = registro
            .iter()
            .find(|s| status_eq(&s.nome, novo_status))
            .ok_or_else(|| AppError::UnknownStatus(novo_status.to_string()))?;
        let status_tecnico = definicao.nome.clone();

        let alteradas = self
            .orders_repo
            .update_status(
                &mut *tx,
                ctx.empresa_id,
                order.id,
                &order.status,
                &status_tecnico,
                order.versao,
            )
            .await?;
        if alteradas == 0 {
            return Err(AppError::StaleVersion);
        }

        self.orders_repo
            .append_history(
                &mut *tx,
                ctx.empresa_id,
                order.id,
                &order.status,
                &status_tecnico,
                &ctx.usuario,
            )
            .await?;

        tx.commit().await?;

        let event = TransitionEvent {
            empresa_id: ctx.empresa_id,
            os_id: order.id,
            numero_os: order.numero_os,
            de: order.status_tecnico.clone(),
            para: status_tecnico.clone(),
            usuario: ctx.usuario.clone(),
            quando: Utc::now(),
        };

        let mut atualizado = order;
        atualizado.status_tecnico = status_tecnico;
        atualizado.versao += 1;

        Ok((atualizado, event))
    }

    // =========================================================================
    //  APARELHO / ATRIBUIÇÃO
    // =========================================================================

    pub async fn update_device(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        tecnico_id: Option<Uuid>,
        device: DeviceFields,
        prazo_entrega: Option<NaiveDate>,
        imagens: Vec<String>,
    ) -> Result<ServiceOrder, AppError> {
        for tentativa in 1..=MAX_TENTATIVAS {
            match self
                .try_update_device(ctx, os_id, tecnico_id, &device, prazo_entrega, &imagens)
                .await
            {
                Err(AppError::StaleVersion) if tentativa < MAX_TENTATIVAS => continue,
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    async fn try_update_device(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        tecnico_id: Option<Uuid>,
        device: &DeviceFields,
        prazo_entrega: Option<NaiveDate>,
        imagens: &[String],
    ) -> Result<ServiceOrder, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self
            .orders_repo
            .get(&mut *tx, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))?;
        if order.entregue() {
            return Err(AppError::OrderAlreadyDelivered);
        }

        if let Some(tecnico_id) = tecnico_id {
            self.catalog_repo
                .get_tecnico(&mut *tx, ctx.empresa_id, tecnico_id)
                .await?
                .ok_or_else(|| AppError::ResourceNotFound("Técnico".to_string()))?;
        }

        let imagens_str = join_imagens(imagens);
        let alteradas = self
            .orders_repo
            .update_device(
                &mut *tx,
                ctx.empresa_id,
                os_id,
                tecnico_id,
                device,
                prazo_entrega,
                if imagens_str.is_empty() { None } else { Some(imagens_str.as_str()) },
                order.versao,
            )
            .await?;
        if alteradas == 0 {
            return Err(AppError::StaleVersion);
        }

        tx.commit().await?;

        self.orders_repo
            .get(&self.pool, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))
    }

    // =========================================================================
    //  ITENS (livro de peças e serviços)
    // =========================================================================

    pub async fn add_item(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        kind: ItemKind,
        catalogo_id: Option<Uuid>,
        nome: Option<String>,
        preco: Option<Decimal>,
        quantidade: i32,
    ) -> Result<ServiceOrder, AppError> {
        for tentativa in 1..=MAX_TENTATIVAS {
            match self
                .try_mutate_itens(ctx, os_id, |ledger| {
                    let item = LedgerItem {
                        id: Uuid::new_v4(),
                        catalogo_id,
                        nome: nome.clone().unwrap_or_default(),
                        preco: preco.unwrap_or(Decimal::ZERO),
                        quantidade: quantidade.max(1),
                    };
                    ledger.add_item(kind, item);
                    true
                })
                .await
            {
                Err(AppError::StaleVersion) if tentativa < MAX_TENTATIVAS => continue,
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    /// Resolve nome/preço de um item do catálogo antes de incluí-lo.
    pub async fn add_item_from_catalog(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        catalogo_id: Uuid,
        quantidade: i32,
    ) -> Result<ServiceOrder, AppError> {
        let item = self
            .catalog_repo
            .get_catalogo_item(&self.pool, ctx.empresa_id, catalogo_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Item do catálogo".to_string()))?;

        let kind = item.tipo.parse::<ItemKind>().unwrap_or(ItemKind::Produto);
        self.add_item(
            ctx,
            os_id,
            kind,
            Some(item.id),
            Some(item.nome),
            Some(item.preco),
            quantidade,
        )
        .await
    }

    pub async fn edit_item(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        item_id: Uuid,
        nome: String,
        preco: Decimal,
        quantidade: i32,
    ) -> Result<ServiceOrder, AppError> {
        for tentativa in 1..=MAX_TENTATIVAS {
            match self
                .try_mutate_itens(ctx, os_id, |ledger| {
                    ledger.edit_item(item_id, &nome, preco, quantidade)
                })
                .await
            {
                Err(AppError::StaleVersion) if tentativa < MAX_TENTATIVAS => continue,
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    pub async fn remove_item(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        item_id: Uuid,
    ) -> Result<ServiceOrder, AppError> {
        for tentativa in 1..=MAX_TENTATIVAS {
            match self
                .try_mutate_itens(ctx, os_id, |ledger| ledger.remove_item(item_id))
                .await
            {
                Err(AppError::StaleVersion) if tentativa < MAX_TENTATIVAS => continue,
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    pub async fn set_item_quantity(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        item_id: Uuid,
        quantidade: i32,
    ) -> Result<ServiceOrder, AppError> {
        for tentativa in 1..=MAX_TENTATIVAS {
            match self
                .try_mutate_itens(ctx, os_id, |ledger| ledger.set_quantity(item_id, quantidade))
                .await
            {
                Err(AppError::StaleVersion) if tentativa < MAX_TENTATIVAS => continue,
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    pub async fn update_desconto(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        desconto: Decimal,
    ) -> Result<ServiceOrder, AppError> {
        for tentativa in 1..=MAX_TENTATIVAS {
            match self.try_update_desconto(ctx, os_id, desconto).await {
                Err(AppError::StaleVersion) if tentativa < MAX_TENTATIVAS => continue,
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    async fn try_update_desconto(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        desconto: Decimal,
    ) -> Result<ServiceOrder, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self
            .orders_repo
            .get(&mut *tx, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))?;
        if order.entregue() {
            return Err(AppError::OrderAlreadyDelivered);
        }

        let rows = self
            .orders_repo
            .list_itens(&mut *tx, ctx.empresa_id, os_id)
            .await?;
        let ledger = ItemLedger::from_rows(&rows, LegacyAggregates::from_order(&order));

        self.gravar_ledger(&mut tx, ctx, &order, &ledger, desconto).await?;
        tx.commit().await?;

        self.orders_repo
            .get(&self.pool, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))
    }

    /// Carrega o livro, aplica a mutação e regrava itens + agregados + espelho
    /// legado numa transação só. A mutação devolve `false` quando o alvo não
    /// existe no livro.
    async fn try_mutate_itens<F>(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        mutate: F,
    ) -> Result<ServiceOrder, AppError>
    where
        F: FnOnce(&mut ItemLedger) -> bool,
    {
        let mut tx = self.pool.begin().await?;

        let order = self
            .orders_repo
            .get(&mut *tx, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))?;
        if order.entregue() {
            return Err(AppError::OrderAlreadyDelivered);
        }

        let rows = self
            .orders_repo
            .list_itens(&mut *tx, ctx.empresa_id, os_id)
            .await?;
        let mut ledger = ItemLedger::from_rows(&rows, LegacyAggregates::from_order(&order));

        if !mutate(&mut ledger) {
            return Err(AppError::ResourceNotFound("Item da OS".to_string()));
        }

        self.gravar_ledger(&mut tx, ctx, &order, &ledger, order.desconto).await?;
        tx.commit().await?;

        self.orders_repo
            .get(&self.pool, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))
    }

    /// Regrava as linhas do livro e os agregados em cache da OS.
    /// Mantém o invariante: valor_faturado = serviços + peças − desconto.
    async fn gravar_ledger(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        ctx: &RequestContext,
        order: &ServiceOrder,
        ledger: &ItemLedger,
        desconto: Decimal,
    ) -> Result<(), AppError> {
        self.orders_repo
            .delete_itens(&mut **tx, ctx.empresa_id, order.id)
            .await?;

        for item in ledger.produtos() {
            self.orders_repo
                .insert_item(
                    &mut **tx,
                    ctx.empresa_id,
                    order.id,
                    item.id,
                    ItemKind::Produto.as_db(),
                    item.catalogo_id,
                    &item.nome,
                    item.preco,
                    item.quantidade,
                )
                .await?;
        }
        for item in ledger.servicos() {
            self.orders_repo
                .insert_item(
                    &mut **tx,
                    ctx.empresa_id,
                    order.id,
                    item.id,
                    ItemKind::Servico.as_db(),
                    item.catalogo_id,
                    &item.nome,
                    item.preco,
                    item.quantidade,
                )
                .await?;
        }

        let totais = ledger.totals();
        let (peca, servico) = if self.espelhar_texto_legado {
            let (p, s) = ledger.to_legacy_text();
            (Some(p), Some(s))
        } else {
            (None, None)
        };

        let alteradas = self
            .orders_repo
            .update_totais(
                &mut **tx,
                ctx.empresa_id,
                order.id,
                totais.total_produtos,
                totais.total_servicos,
                desconto,
                totais.faturado(desconto),
                peca.as_deref(),
                servico.as_deref(),
                order.versao,
            )
            .await?;
        if alteradas == 0 {
            return Err(AppError::StaleVersion);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabela_de_transicao_forca_o_status_tecnico() {
        assert_eq!(forced_status_tecnico("APROVADO"), Some("APROVADO"));
        assert_eq!(forced_status_tecnico("aprovado"), Some("APROVADO"));
        assert_eq!(forced_status_tecnico("ENTREGUE"), Some("FINALIZADA"));
        assert_eq!(
            forced_status_tecnico("AGUARDANDO APROVAÇÃO"),
            Some("AGUARDANDO APROVAÇÃO")
        );
        assert_eq!(
            forced_status_tecnico("aguardando  aprovacao"),
            Some("AGUARDANDO APROVAÇÃO")
        );
    }

    #[test]
    fn demais_status_preservam_o_ajuste_manual() {
        assert_eq!(forced_status_tecnico("EM ANÁLISE"), None);
        assert_eq!(forced_status_tecnico("AGUARDANDO PEÇA"), None);
        assert_eq!(forced_status_tecnico("ORÇAMENTO ENVIADO"), None);
        assert_eq!(forced_status_tecnico(""), None);
    }
}
