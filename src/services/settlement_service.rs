// src/services/settlement_service.rs
//
// Liquidação da entrega: a única transição terminal da OS. Valida termo de
// garantia, forma de pagamento e valor recebido; então, numa transação só,
// fecha a OS (status/datas/garantia) e cria a venda com número sequencial da
// empresa. Ou tudo entra, ou nada entra: uma OS nunca fica marcada como
// entregue sem a venda correspondente.

use chrono::{Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CatalogRepository, OrdersRepository, SalesRepository},
    middleware::RequestContext,
    models::{
        orders::{ServiceOrder, TransitionEvent},
        sales::{PaymentMethod, Sale},
    },
    services::{
        ledger::{ItemLedger, LegacyAggregates},
        order_service::OrderService,
    },
};

// Janela de garantia contada a partir do dia da entrega.
const DIAS_GARANTIA: u64 = 90;

// Tentativas para conflitos de versão ou de número sequencial.
const MAX_TENTATIVAS: u32 = 3;

/// Resultado da liquidação: a OS fechada e a venda gerada (quando o valor
/// faturado é maior que zero).
#[derive(Debug)]
pub struct DeliveryReceipt {
    pub ordem: ServiceOrder,
    pub venda: Option<Sale>,
    pub event: TransitionEvent,
}

/// Valor recebido cobre o faturado? Devolve o que falta quando não cobre.
pub fn validar_pagamento(valor_recebido: Decimal, valor_faturado: Decimal) -> Result<(), AppError> {
    if valor_recebido < valor_faturado {
        return Err(AppError::InsufficientPayment {
            falta: valor_faturado - valor_recebido,
        });
    }
    Ok(())
}

pub fn vencimento_garantia(data_entrega: NaiveDate) -> NaiveDate {
    data_entrega + Days::new(DIAS_GARANTIA)
}

#[derive(Clone)]
pub struct SettlementService {
    pool: PgPool,
    orders_repo: OrdersRepository,
    sales_repo: SalesRepository,
    catalog_repo: CatalogRepository,
    order_service: OrderService,
}

impl SettlementService {
    pub fn new(
        pool: PgPool,
        orders_repo: OrdersRepository,
        sales_repo: SalesRepository,
        catalog_repo: CatalogRepository,
        order_service: OrderService,
    ) -> Self {
        Self {
            pool,
            orders_repo,
            sales_repo,
            catalog_repo,
            order_service,
        }
    }

    /// Lado de leitura do livro de vendas geradas pelas entregas.
    pub async fn list_sales(&self, ctx: &RequestContext) -> Result<Vec<Sale>, AppError> {
        self.sales_repo.list(&self.pool, ctx.empresa_id).await
    }

    pub async fn deliver(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        termo_garantia_id: Uuid,
        forma_pagamento: &str,
        valor_recebido: Decimal,
    ) -> Result<DeliveryReceipt, AppError> {
        // Forma de pagamento é um conjunto fechado; valida antes de abrir transação.
        let pagamento = forma_pagamento
            .parse::<PaymentMethod>()
            .map_err(|_| AppError::InvalidPaymentMethod(forma_pagamento.to_string()))?;

        for tentativa in 1..=MAX_TENTATIVAS {
            match self
                .try_deliver(ctx, os_id, termo_garantia_id, pagamento, valor_recebido)
                .await
            {
                Err(e)
                    if tentativa < MAX_TENTATIVAS
                        && (matches!(e, AppError::StaleVersion) || e.is_unique_violation()) =>
                {
                    tracing::debug!(os_id = %os_id, tentativa, "Conflito na liquidação, repetindo");
                    continue;
                }
                outro => return outro,
            }
        }
        Err(AppError::StaleVersion)
    }

    async fn try_deliver(
        &self,
        ctx: &RequestContext,
        os_id: Uuid,
        termo_garantia_id: Uuid,
        pagamento: PaymentMethod,
        valor_recebido: Decimal,
    ) -> Result<DeliveryReceipt, AppError> {
        let mut tx = self.pool.begin().await?;

        let order = self
            .orders_repo
            .get(&mut *tx, ctx.empresa_id, os_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Ordem de serviço".to_string()))?;
        if order.entregue() {
            return Err(AppError::OrderAlreadyDelivered);
        }

        self.catalog_repo
            .get_termo_garantia(&mut *tx, ctx.empresa_id, termo_garantia_id)
            .await?
            .ok_or(AppError::MissingWarrantyTerm)?;

        // O faturado sai do livro de itens (com a reserva legada), não do cache.
        let rows = self
            .orders_repo
            .list_itens(&mut *tx, ctx.empresa_id, os_id)
            .await?;
        let ledger = ItemLedger::from_rows(&rows, LegacyAggregates::from_order(&order));
        let valor_faturado = ledger.totals().faturado(order.desconto);

        validar_pagamento(valor_recebido, valor_faturado)?;

        // Fecha a OS pelo mesmo caminho de qualquer transição: ENTREGUE força
        // FINALIZADA e registra a trilha.
        let aplicado = self
            .order_service
            .apply_status_on(&mut *tx, ctx, &order, "ENTREGUE")
            .await?;

        let hoje = Utc::now().date_naive();
        let alteradas = self
            .orders_repo
            .set_entrega(
                &mut *tx,
                ctx.empresa_id,
                os_id,
                termo_garantia_id,
                hoje,
                vencimento_garantia(hoje),
                valor_faturado,
                aplicado.versao,
            )
            .await?;
        if alteradas == 0 {
            return Err(AppError::StaleVersion);
        }

        // Venda na MESMA transação da OS: se o insert falhar, o fechamento
        // inteiro desfaz junto.
        let venda = if valor_faturado > Decimal::ZERO {
            let numero_venda = self
                .sales_repo
                .next_sale_number(&mut *tx, ctx.empresa_id)
                .await?;

            let cliente = self
                .catalog_repo
                .get_cliente(&mut *tx, ctx.empresa_id, order.cliente_id)
                .await?;
            let observacoes = match cliente {
                Some(c) => format!("O.S. #{} - {}", order.numero_os, c.nome),
                None => format!("O.S. #{}", order.numero_os),
            };

            Some(
                self.sales_repo
                    .insert_sale(
                        &mut *tx,
                        ctx.empresa_id,
                        numero_venda,
                        Some(order.cliente_id),
                        valor_faturado,
                        pagamento.as_db(),
                        &observacoes,
                    )
                    .await?,
            )
        } else {
            None
        };

        tx.commit().await?;

        let mut ordem = order;
        ordem.status = aplicado.status;
        ordem.status_tecnico = aplicado.status_tecnico;
        ordem.termo_garantia_id = Some(termo_garantia_id);
        ordem.data_entrega = Some(hoje);
        ordem.vencimento_garantia = Some(vencimento_garantia(hoje));
        ordem.valor_faturado = valor_faturado;
        ordem.versao = aplicado.versao + 1;

        Ok(DeliveryReceipt {
            ordem,
            venda,
            event: aplicado.event,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn valor_exato_liquida() {
        assert!(validar_pagamento(dec("200.00"), dec("200.00")).is_ok());
        assert!(validar_pagamento(dec("250.00"), dec("200.00")).is_ok());
    }

    #[test]
    fn um_centavo_a_menos_reprova_com_a_falta() {
        let err = validar_pagamento(dec("199.99"), dec("200.00")).unwrap_err();
        match err {
            AppError::InsufficientPayment { falta } => assert_eq!(falta, dec("0.01")),
            outro => panic!("erro inesperado: {outro:?}"),
        }
    }

    #[test]
    fn garantia_vence_noventa_dias_depois() {
        let entrega = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            vencimento_garantia(entrega),
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );
    }
}
