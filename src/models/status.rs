// src/models/status.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

/// Domínio de um status: etapa da OS (balcão) ou etapa do técnico (bancada).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusDomain {
    Os,
    Tecnico,
}

impl StatusDomain {
    /// Valor gravado na coluna `tipo`.
    pub fn as_db(&self) -> &'static str {
        match self {
            StatusDomain::Os => "os",
            StatusDomain::Tecnico => "tecnico",
        }
    }
}

impl std::str::FromStr for StatusDomain {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "os" => Ok(StatusDomain::Os),
            "tecnico" => Ok(StatusDomain::Tecnico),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusOrigin {
    /// Fixo do sistema: não pode ser renomeado nem excluído.
    Fixo,
    /// Criado pela empresa: editável e removível.
    Personalizado,
}

// --- Structs ---

/// Uma entrada do cadastro de status, já unificando fixos e personalizados.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusDefinition {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "AGUARDANDO PEÇA")]
    pub nome: String,
    #[schema(example = "#f97316")]
    pub cor: String,
    #[schema(example = 5)]
    pub ordem: i32,
    pub dominio: StatusDomain,
    pub origem: StatusOrigin,
}

// Linha crua da consulta unificada (status_fixo UNION status_personalizado).
#[derive(Debug, Clone, FromRow)]
pub struct StatusRow {
    pub id: Uuid,
    pub nome: String,
    pub cor: String,
    pub ordem: i32,
    pub tipo: String,
    pub fixo: bool,
}

impl StatusRow {
    pub fn into_definition(self) -> StatusDefinition {
        StatusDefinition {
            id: self.id,
            nome: self.nome,
            cor: self.cor,
            ordem: self.ordem,
            dominio: if self.tipo == "tecnico" {
                StatusDomain::Tecnico
            } else {
                StatusDomain::Os
            },
            origem: if self.fixo {
                StatusOrigin::Fixo
            } else {
                StatusOrigin::Personalizado
            },
        }
    }
}
