// src/models/orders.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums ---

/// Natureza de um item da OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Produto,
    Servico,
}

impl ItemKind {
    pub fn as_db(&self) -> &'static str {
        match self {
            ItemKind::Produto => "produto",
            ItemKind::Servico => "servico",
        }
    }
}

impl std::str::FromStr for ItemKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "produto" => Ok(ItemKind::Produto),
            "servico" => Ok(ItemKind::Servico),
            _ => Err(()),
        }
    }
}

// --- Structs ---

/// Ordem de serviço (raiz do agregado).
///
/// Os campos `valor_*`/`qtd_*`/`valor_faturado` são agregados em cache,
/// sempre re-deriváveis dos itens estruturados; `peca`/`servico` são os
/// espelhos legados em texto livre.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrder {
    pub id: Uuid,
    #[schema(ignore)]
    pub empresa_id: Uuid,
    #[schema(example = 1042)]
    pub numero_os: i64,
    pub cliente_id: Uuid,
    pub tecnico_id: Option<Uuid>,
    pub termo_garantia_id: Option<Uuid>,

    #[schema(example = "EM ANÁLISE")]
    pub status: String,
    #[schema(example = "ORÇAMENTO ENVIADO")]
    pub status_tecnico: String,
    pub retorno: bool,

    // Descrição do aparelho (opaca para o núcleo)
    pub categoria: Option<String>,
    pub marca: Option<String>,
    pub modelo: Option<String>,
    pub cor: Option<String>,
    pub numero_serie: Option<String>,
    pub acessorios: Option<String>,
    pub condicoes_equipamento: Option<String>,

    #[schema(example = "80.00")]
    pub valor_peca: Decimal,
    pub qtd_peca: i32,
    #[schema(example = "150.00")]
    pub valor_servico: Decimal,
    pub qtd_servico: i32,
    #[schema(example = "0.00")]
    pub desconto: Decimal,
    #[schema(example = "230.00")]
    pub valor_faturado: Decimal,

    pub peca: Option<String>,
    pub servico: Option<String>,

    // Lista de URLs serializada por vírgula no banco
    pub imagens: Option<String>,

    pub criado_em: DateTime<Utc>,
    pub prazo_entrega: Option<NaiveDate>,
    pub data_entrega: Option<NaiveDate>,
    pub vencimento_garantia: Option<NaiveDate>,

    #[schema(ignore)]
    pub versao: i64,
}

impl ServiceOrder {
    /// A OS foi liquidada na entrega? A partir daí nenhum campo de fluxo
    /// ou financeiro aceita mutação.
    pub fn entregue(&self) -> bool {
        self.data_entrega.is_some()
    }

    /// URLs de imagem, descartando segmentos vazios.
    pub fn lista_imagens(&self) -> Vec<String> {
        split_imagens(self.imagens.as_deref().unwrap_or(""))
    }
}

/// Item estruturado (peça ou serviço) de uma OS.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OsItem {
    pub id: Uuid,
    #[schema(ignore)]
    pub empresa_id: Uuid,
    pub os_id: Uuid,
    #[schema(example = "produto")]
    pub tipo: String,
    pub catalogo_id: Option<Uuid>,
    #[schema(example = "Tela LCD")]
    pub nome: String,
    #[schema(example = "80.00")]
    pub preco: Decimal,
    #[schema(example = 1)]
    pub quantidade: i32,
    pub criado_em: DateTime<Utc>,
}

/// Entrada da trilha de auditoria de transições. Somente inserção.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub id: Uuid,
    #[schema(ignore)]
    pub empresa_id: Uuid,
    pub os_id: Uuid,
    #[schema(example = "APROVADO")]
    pub status: String,
    #[schema(example = "APROVADO")]
    pub status_tecnico: String,
    #[schema(example = "maria")]
    pub usuario: String,
    pub criado_em: DateTime<Utc>,
}

/// Evento emitido após cada transição de status, consumido pelo
/// despachante externo de notificações.
#[derive(Debug, Clone)]
pub struct TransitionEvent {
    pub empresa_id: Uuid,
    pub os_id: Uuid,
    pub numero_os: i64,
    pub de: String,
    pub para: String,
    pub usuario: String,
    pub quando: DateTime<Utc>,
}

/// OS completa para a tela de detalhe.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub header: ServiceOrder,
    pub cliente_nome: Option<String>,
    pub itens: Vec<OsItem>,
    pub imagens_lista: Vec<String>,
}

// --- Serialização da lista de imagens (única coluna delimitada) ---

pub fn split_imagens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn join_imagens(urls: &[String]) -> String {
    urls.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_descarta_segmentos_vazios() {
        assert_eq!(
            split_imagens("https://a/1.jpg,,https://a/2.jpg, "),
            vec!["https://a/1.jpg".to_string(), "https://a/2.jpg".to_string()]
        );
        assert!(split_imagens("").is_empty());
    }

    #[test]
    fn join_e_split_preservam_a_lista() {
        let urls = vec!["https://a/1.jpg".to_string(), "https://a/2.jpg".to_string()];
        assert_eq!(split_imagens(&join_imagens(&urls)), urls);
    }
}
