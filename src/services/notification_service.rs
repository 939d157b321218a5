// src/services/notification_service.rs

use sqlx::PgPool;

use crate::{common::normalize::normalize_status, models::orders::TransitionEvent};

/// Consome eventos de transição e grava a notificação na caixa de saída
/// (`notificacoes`) para o despachante externo (WhatsApp/push).
///
/// Falha aqui nunca derruba a transição que já foi confirmada: o erro é
/// apenas logado para o despachante reprocessar.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Tipo de notificação disparado pelo novo status, se houver.
    fn trigger_for(novo_status: &str) -> Option<(&'static str, &'static str)> {
        match normalize_status(novo_status).as_str() {
            "ORCAMENTO ENVIADO" => Some(("orcamento_enviado", "orçamento enviado")),
            "REPARO CONCLUIDO" => Some(("reparo_concluido", "reparo concluído")),
            _ => None,
        }
    }

    pub async fn publish_transition(&self, event: &TransitionEvent) {
        let Some((tipo, descricao)) = Self::trigger_for(&event.para) else {
            return;
        };

        let mensagem = format!("OS #{} - {} por {}.", event.numero_os, descricao, event.usuario);

        let result = sqlx::query(
            r#"
            INSERT INTO notificacoes (empresa_id, tipo, os_id, mensagem)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(event.empresa_id)
        .bind(tipo)
        .bind(event.os_id)
        .bind(mensagem)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                os_id = %event.os_id,
                tipo,
                "Falha ao enfileirar notificação (será reprocessada pelo despachante): {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispara_somente_nos_status_mapeados() {
        assert_eq!(
            NotificationService::trigger_for("ORÇAMENTO ENVIADO").map(|t| t.0),
            Some("orcamento_enviado")
        );
        assert_eq!(
            NotificationService::trigger_for("reparo concluído").map(|t| t.0),
            Some("reparo_concluido")
        );
        assert!(NotificationService::trigger_for("APROVADO").is_none());
        assert!(NotificationService::trigger_for("ENTREGUE").is_none());
    }
}
