// src/models/catalog.rs
//
// Colaboradores de borda: o núcleo só consulta estas tabelas, nunca as muta.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Cliente {
    pub id: Uuid,
    #[schema(ignore)]
    pub empresa_id: Uuid,
    #[schema(example = "JOÃO DA SILVA")]
    pub nome: String,
    pub telefone: Option<String>,
    pub email: Option<String>,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tecnico {
    pub id: Uuid,
    #[schema(ignore)]
    pub empresa_id: Uuid,
    pub nome: String,
    pub criado_em: DateTime<Utc>,
}

/// Modelo de texto reutilizável com as condições de cobertura,
/// referenciado pela OS na entrega.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TermoGarantia {
    pub id: Uuid,
    #[schema(ignore)]
    pub empresa_id: Uuid,
    #[schema(example = "Garantia padrão 90 dias")]
    pub nome: String,
    pub conteudo: String,
    pub criado_em: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogoItem {
    pub id: Uuid,
    #[schema(ignore)]
    pub empresa_id: Uuid,
    #[schema(example = "Troca de tela")]
    pub nome: String,
    #[schema(example = "150.00")]
    pub preco: Decimal,
    #[schema(example = "servico")]
    pub tipo: String,
    pub criado_em: DateTime<Utc>,
}
