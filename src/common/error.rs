use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// Taxonomia: validação (recuperável pelo chamador), concorrência (retentada
// pelo serviço dono), consistência (fatal para a operação) e infraestrutura.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Status desconhecido: {0}")]
    UnknownStatus(String),

    #[error("Status fixo do sistema: {0}")]
    ProtectedStatus(String),

    #[error("Termo de garantia obrigatório")]
    MissingWarrantyTerm,

    #[error("Forma de pagamento inválida: {0}")]
    InvalidPaymentMethod(String),

    #[error("Valor recebido insuficiente (faltam {falta})")]
    InsufficientPayment { falta: Decimal },

    #[error("Ordem de serviço já entregue")]
    OrderAlreadyDelivered,

    // Escrita perdeu a corrida de versão da OS. Retentada de forma limitada
    // pelo serviço; só chega ao cliente se as tentativas esgotarem.
    #[error("Conflito de concorrência na ordem de serviço")]
    StaleVersion,

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    /// Violação de unicidade vinda do Postgres (código 23505).
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::DatabaseError(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("23505")
            }
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::UnknownStatus(nome) => {
                let body = Json(json!({
                    "error": format!("O status '{}' não existe no cadastro desta empresa.", nome),
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::ProtectedStatus(nome) => {
                let body = Json(json!({
                    "error": format!("O status '{}' é fixo do sistema e não pode ser alterado ou removido.", nome),
                }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::InsufficientPayment { falta } => {
                // O valor que falta volta no corpo para o caixa corrigir a entrada.
                let body = Json(json!({
                    "error": format!("Valor recebido insuficiente: faltam R$ {:.2}.", falta),
                    "falta": falta,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::MissingWarrantyTerm => (
                StatusCode::BAD_REQUEST,
                "Selecione um termo de garantia para registrar a entrega.".to_string(),
            ),
            AppError::InvalidPaymentMethod(valor) => (
                StatusCode::BAD_REQUEST,
                format!("Forma de pagamento inválida: '{}'.", valor),
            ),
            AppError::OrderAlreadyDelivered => (
                StatusCode::CONFLICT,
                "Esta ordem de serviço já foi entregue e não aceita mais alterações.".to_string(),
            ),
            AppError::StaleVersion => (
                StatusCode::CONFLICT,
                "A ordem de serviço foi alterada por outra operação. Tente novamente.".to_string(),
            ),
            AppError::ResourceNotFound(recurso) => (
                StatusCode::NOT_FOUND,
                format!("{} não encontrado.", recurso),
            ),

            // Todos os outros erros (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
