// src/services/status_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::StatusRepository,
    models::status::{StatusDefinition, StatusDomain},
};

#[derive(Clone)]
pub struct StatusService {
    repo: StatusRepository,
}

impl StatusService {
    pub fn new(repo: StatusRepository) -> Self {
        Self { repo }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        dominio: StatusDomain,
    ) -> Result<Vec<StatusDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = self.repo.list(executor, empresa_id, dominio).await?;
        Ok(rows.into_iter().map(|r| r.into_definition()).collect())
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        dominio: StatusDomain,
        nome: &str,
        cor: &str,
    ) -> Result<StatusDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = self
            .repo
            .create_custom(executor, empresa_id, dominio, nome, cor)
            .await?;
        Ok(row.into_definition())
    }

    /// Renomeia/recolore um status personalizado. Status fixos rejeitam
    /// com `ProtectedStatus`.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        id: Uuid,
        nome: &str,
        cor: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        if let Some(nome_fixo) = self.repo.is_fixed(&mut *tx, id).await? {
            return Err(AppError::ProtectedStatus(nome_fixo));
        }

        let alteradas = self
            .repo
            .update_custom(&mut *tx, empresa_id, id, nome, cor)
            .await?;
        if alteradas == 0 {
            return Err(AppError::ResourceNotFound("Status".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        if let Some(nome_fixo) = self.repo.is_fixed(&mut *tx, id).await? {
            return Err(AppError::ProtectedStatus(nome_fixo));
        }

        let removidas = self.repo.delete_custom(&mut *tx, empresa_id, id).await?;
        if removidas == 0 {
            return Err(AppError::ResourceNotFound("Status".to_string()));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Reordena o espaço combinado (fixos + personalizados) de uma vez só.
    /// Qualquer id fora do cadastro aborta a transação inteira: estado
    /// parcial de ordinais não é um fim aceitável.
    pub async fn reorder<'e, E>(
        &self,
        executor: E,
        empresa_id: Uuid,
        dominio: StatusDomain,
        ids: &[Uuid],
    ) -> Result<Vec<StatusDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let atuais = self.repo.list(&mut *tx, empresa_id, dominio).await?;
        if ids.len() != atuais.len() {
            return Err(AppError::ValidationError(erro_de_campo(
                "ids",
                "A reordenação precisa conter todos os status do domínio.",
            )));
        }

        for (ordem, id) in ids.iter().enumerate() {
            let Some(atual) = atuais.iter().find(|s| s.id == *id) else {
                return Err(AppError::ResourceNotFound("Status".to_string()));
            };

            let alteradas = if atual.fixo {
                self.repo
                    .set_ordem_fixo(&mut *tx, *id, dominio, ordem as i32)
                    .await?
            } else {
                self.repo
                    .set_ordem_personalizado(&mut *tx, empresa_id, *id, dominio, ordem as i32)
                    .await?
            };
            if alteradas == 0 {
                return Err(AppError::ResourceNotFound("Status".to_string()));
            }
        }

        let reordenados = self.repo.list(&mut *tx, empresa_id, dominio).await?;
        tx.commit().await?;

        Ok(reordenados.into_iter().map(|r| r.into_definition()).collect())
    }
}

fn erro_de_campo(campo: &'static str, mensagem: &'static str) -> validator::ValidationErrors {
    let mut errors = validator::ValidationErrors::new();
    let mut err = validator::ValidationError::new("invalid");
    err.message = Some(std::borrow::Cow::Borrowed(mensagem));
    errors.add(campo.into(), err);
    errors
}
