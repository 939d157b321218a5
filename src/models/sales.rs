// src/models/sales.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Formas de pagamento aceitas na entrega.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Dinheiro,
    Pix,
    CartaoDebito,
    CartaoCredito,
    Transferencia,
}

impl PaymentMethod {
    pub fn as_db(&self) -> &'static str {
        match self {
            PaymentMethod::Dinheiro => "dinheiro",
            PaymentMethod::Pix => "pix",
            PaymentMethod::CartaoDebito => "cartao_debito",
            PaymentMethod::CartaoCredito => "cartao_credito",
            PaymentMethod::Transferencia => "transferencia",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dinheiro" => Ok(PaymentMethod::Dinheiro),
            "pix" => Ok(PaymentMethod::Pix),
            "cartao_debito" => Ok(PaymentMethod::CartaoDebito),
            "cartao_credito" => Ok(PaymentMethod::CartaoCredito),
            "transferencia" => Ok(PaymentMethod::Transferencia),
            _ => Err(()),
        }
    }
}

/// Venda gerada na entrega de uma OS. O status nasce `finalizada`;
/// a OS não é dona da venda, a venda só referencia a OS em `observacoes`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    #[schema(ignore)]
    pub empresa_id: Uuid,
    #[schema(example = 57)]
    pub numero_venda: i64,
    pub data_venda: DateTime<Utc>,
    pub cliente_id: Option<Uuid>,
    #[schema(example = "230.00")]
    pub total: Decimal,
    #[schema(example = "pix")]
    pub forma_pagamento: String,
    #[schema(example = "finalizada")]
    pub status: String,
    #[schema(example = "O.S. #1042 - JOÃO DA SILVA")]
    pub observacoes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn aceita_as_cinco_formas() {
        assert_eq!(PaymentMethod::from_str("dinheiro"), Ok(PaymentMethod::Dinheiro));
        assert_eq!(PaymentMethod::from_str("PIX"), Ok(PaymentMethod::Pix));
        assert_eq!(PaymentMethod::from_str("cartao_debito"), Ok(PaymentMethod::CartaoDebito));
        assert_eq!(PaymentMethod::from_str(" cartao_credito "), Ok(PaymentMethod::CartaoCredito));
        assert_eq!(PaymentMethod::from_str("transferencia"), Ok(PaymentMethod::Transferencia));
    }

    #[test]
    fn rejeita_forma_desconhecida() {
        assert!(PaymentMethod::from_str("cheque").is_err());
        assert!(PaymentMethod::from_str("").is_err());
    }
}
