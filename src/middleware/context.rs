// src/middleware/context.rs

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use axum::{Json, response::IntoResponse};
use serde_json::json;
use uuid::Uuid;

// Cabeçalhos que identificam a empresa e o usuário em cada requisição.
// O núcleo nunca lê contexto ambiente: tudo chega explícito por aqui.
const TENANT_ID_HEADER: &str = "x-tenant-id";
const USUARIO_HEADER: &str = "x-usuario";

/// Contexto explícito da requisição: empresa (tenant) + ator.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub empresa_id: Uuid,
    pub usuario: String,
}

/// Rejeição simples com status + mensagem, já respondível.
#[derive(Debug)]
pub struct ContextRejection {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ContextRejection {
    fn into_response(self) -> axum::response::Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ContextRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Tenta ler o cabeçalho X-Tenant-ID
        let header_value = parts.headers.get(TENANT_ID_HEADER).ok_or(ContextRejection {
            status: StatusCode::BAD_REQUEST,
            message: "O cabeçalho X-Tenant-ID é obrigatório.".to_string(),
        })?;

        let value_str = header_value.to_str().map_err(|_| ContextRejection {
            status: StatusCode::BAD_REQUEST,
            message: "Cabeçalho X-Tenant-ID contém caracteres inválidos.".to_string(),
        })?;

        let empresa_id = Uuid::parse_str(value_str).map_err(|_| ContextRejection {
            status: StatusCode::BAD_REQUEST,
            message: "Cabeçalho X-Tenant-ID inválido (não é um UUID).".to_string(),
        })?;

        // O ator vai para a trilha de auditoria; sem ele não há transição rastreável.
        let usuario = parts
            .headers
            .get(USUARIO_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ContextRejection {
                status: StatusCode::BAD_REQUEST,
                message: "O cabeçalho X-Usuario é obrigatório.".to_string(),
            })?;

        Ok(RequestContext { empresa_id, usuario })
    }
}
