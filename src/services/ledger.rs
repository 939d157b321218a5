// src/services/ledger.rs
//
// Livro de itens de uma OS: peças e serviços estruturados, totais agregados
// e a ponte com a representação legada em texto livre (`peca`/`servico`),
// usada por OSs anteriores aos itens estruturados.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::orders::{ItemKind, OsItem, ServiceOrder};

// Nomes reconstruídos do texto legado são cortados neste tamanho.
const NOME_LEGADO_MAX: usize = 50;

/// Um item do livro. `id` identifica a linha dentro da OS; `catalogo_id`
/// é a identidade de mesclagem de produtos vindos do catálogo.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerItem {
    pub id: Uuid,
    pub catalogo_id: Option<Uuid>,
    pub nome: String,
    pub preco: Decimal,
    pub quantidade: i32,
}

impl LedgerItem {
    pub fn total(&self) -> Decimal {
        self.preco * Decimal::from(self.quantidade)
    }
}

/// Agregados legados carregados da OS, usados como reserva quando a lista
/// estruturada está vazia.
#[derive(Debug, Clone, Default)]
pub struct LegacyAggregates {
    pub peca: Option<String>,
    pub valor_peca: Decimal,
    pub qtd_peca: i32,
    pub servico: Option<String>,
    pub valor_servico: Decimal,
    pub qtd_servico: i32,
}

impl LegacyAggregates {
    pub fn from_order(order: &ServiceOrder) -> Self {
        Self {
            peca: order.peca.clone(),
            valor_peca: order.valor_peca,
            qtd_peca: order.qtd_peca,
            servico: order.servico.clone(),
            valor_servico: order.valor_servico,
            qtd_servico: order.qtd_servico,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totais {
    pub total_produtos: Decimal,
    pub total_servicos: Decimal,
}

impl Totais {
    /// Valor faturado: serviços + peças − desconto.
    pub fn faturado(&self, desconto: Decimal) -> Decimal {
        self.total_produtos + self.total_servicos - desconto
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemLedger {
    produtos: Vec<LedgerItem>,
    servicos: Vec<LedgerItem>,
    legado: LegacyAggregates,
    // Verdadeiro apenas para registros anteriores aos itens estruturados,
    // enquanto ninguém mexe no livro. Qualquer mutação desliga: a partir daí
    // o agregado legado não pode mais ressuscitar um lado esvaziado de
    // propósito.
    legado_ativo: bool,
}

impl ItemLedger {
    /// Monta o livro a partir das linhas persistidas. Sem linhas, a
    /// reconstrução legada entra em ação (melhor esforço, com perdas).
    pub fn from_rows(rows: &[OsItem], legado: LegacyAggregates) -> Self {
        if rows.is_empty() {
            return LegacyReconciler::reconstruct(legado);
        }

        let mut ledger = ItemLedger {
            legado,
            ..Default::default()
        };

        for row in rows {
            let item = LedgerItem {
                id: row.id,
                catalogo_id: row.catalogo_id,
                nome: row.nome.clone(),
                preco: row.preco,
                quantidade: row.quantidade,
            };
            if row.tipo == "servico" {
                ledger.servicos.push(item);
            } else {
                ledger.produtos.push(item);
            }
        }

        ledger
    }

    pub fn produtos(&self) -> &[LedgerItem] {
        &self.produtos
    }

    pub fn servicos(&self) -> &[LedgerItem] {
        &self.servicos
    }

    pub fn is_empty(&self) -> bool {
        self.produtos.is_empty() && self.servicos.is_empty()
    }

    /// Inclui um item. Produto com a mesma identidade de catálogo soma
    /// quantidade em vez de duplicar a linha; serviço é sempre acrescentado.
    pub fn add_item(&mut self, kind: ItemKind, item: LedgerItem) {
        self.legado_ativo = false;
        match kind {
            ItemKind::Produto => {
                let existente = item.catalogo_id.and_then(|cat| {
                    self.produtos
                        .iter_mut()
                        .find(|p| p.catalogo_id == Some(cat))
                });
                if let Some(existente) = existente {
                    existente.quantidade += item.quantidade.max(1);
                } else {
                    self.produtos.push(item);
                }
            }
            ItemKind::Servico => {
                self.servicos.push(item);
            }
        }
    }

    pub fn remove_item(&mut self, id: Uuid) -> bool {
        self.legado_ativo = false;
        let antes = self.produtos.len() + self.servicos.len();
        self.produtos.retain(|p| p.id != id);
        self.servicos.retain(|s| s.id != id);
        antes != self.produtos.len() + self.servicos.len()
    }

    pub fn edit_item(&mut self, id: Uuid, nome: &str, preco: Decimal, quantidade: i32) -> bool {
        self.legado_ativo = false;
        if quantidade <= 0 {
            return self.remove_item(id);
        }
        match self.find_mut(id) {
            Some(item) => {
                item.nome = nome.to_string();
                item.preco = preco;
                item.quantidade = quantidade;
                true
            }
            None => false,
        }
    }

    /// Quantidade ≤ 0 equivale a remover o item.
    pub fn set_quantity(&mut self, id: Uuid, quantidade: i32) -> bool {
        self.legado_ativo = false;
        if quantidade <= 0 {
            return self.remove_item(id);
        }
        match self.find_mut(id) {
            Some(item) => {
                item.quantidade = quantidade;
                true
            }
            None => false,
        }
    }

    fn find_mut(&mut self, id: Uuid) -> Option<&mut LedgerItem> {
        self.produtos
            .iter_mut()
            .chain(self.servicos.iter_mut())
            .find(|i| i.id == id)
    }

    /// Totais por lado. Regra de compatibilidade (não é um default): num
    /// registro anterior aos itens estruturados e ainda intocado, um lado sem
    /// itens reporta o agregado legado em vez de zero.
    pub fn totals(&self) -> Totais {
        let total_produtos = if self.produtos.is_empty() && self.legado_ativo {
            self.legado.valor_peca * Decimal::from(self.legado.qtd_peca.max(1))
        } else {
            self.produtos.iter().map(LedgerItem::total).sum()
        };

        let total_servicos = if self.servicos.is_empty() && self.legado_ativo {
            self.legado.valor_servico * Decimal::from(self.legado.qtd_servico.max(1))
        } else {
            self.servicos.iter().map(LedgerItem::total).sum()
        };

        Totais {
            total_produtos,
            total_servicos,
        }
    }

    /// Renderização legada em texto, gravada de volta nos campos `peca` e
    /// `servico` enquanto houver leitores da representação antiga.
    pub fn to_legacy_text(&self) -> (String, String) {
        let peca = self
            .produtos
            .iter()
            .map(|p| format!("{} ({}x) - R$ {:.2}", p.nome, p.quantidade, p.total()))
            .collect::<Vec<_>>()
            .join(", ");

        let servico = self
            .servicos
            .iter()
            .map(|s| format!("{} - R$ {:.2}", s.nome, s.preco))
            .collect::<Vec<_>>()
            .join(", ");

        (peca, servico)
    }
}

/// Reconstrução de OSs anteriores aos itens estruturados: um item sintético
/// por campo legado, com nome truncado e preço igual ao agregado em cache.
pub struct LegacyReconciler;

impl LegacyReconciler {
    pub fn reconstruct(legado: LegacyAggregates) -> ItemLedger {
        let mut produtos = Vec::new();
        let mut servicos = Vec::new();

        if let Some(texto) = legado.peca.as_deref() {
            if !texto.trim().is_empty() && legado.valor_peca > Decimal::ZERO {
                produtos.push(LedgerItem {
                    id: Uuid::new_v4(),
                    catalogo_id: None,
                    nome: truncar_nome(texto),
                    preco: legado.valor_peca,
                    quantidade: 1,
                });
            }
        }

        if let Some(texto) = legado.servico.as_deref() {
            if !texto.trim().is_empty() && legado.valor_servico > Decimal::ZERO {
                servicos.push(LedgerItem {
                    id: Uuid::new_v4(),
                    catalogo_id: None,
                    nome: truncar_nome(texto),
                    preco: legado.valor_servico,
                    quantidade: 1,
                });
            }
        }

        ItemLedger {
            produtos,
            servicos,
            legado,
            legado_ativo: true,
        }
    }
}

fn truncar_nome(texto: &str) -> String {
    let texto = texto.trim();
    if texto.chars().count() > NOME_LEGADO_MAX {
        let cortado: String = texto.chars().take(NOME_LEGADO_MAX).collect();
        format!("{}...", cortado)
    } else {
        texto.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn produto(id: Uuid, nome: &str, preco: &str, qtd: i32) -> LedgerItem {
        LedgerItem {
            id,
            catalogo_id: Some(id),
            nome: nome.to_string(),
            preco: dec(preco),
            quantidade: qtd,
        }
    }

    #[test]
    fn produto_repetido_soma_quantidade() {
        let id = Uuid::new_v4();
        let mut ledger = ItemLedger::default();
        ledger.add_item(ItemKind::Produto, produto(id, "Tela LCD", "80.00", 1));
        ledger.add_item(ItemKind::Produto, produto(id, "Tela LCD", "80.00", 1));

        assert_eq!(ledger.produtos().len(), 1);
        assert_eq!(ledger.produtos()[0].quantidade, 2);
        assert_eq!(ledger.totals().total_produtos, dec("160.00"));
    }

    #[test]
    fn servico_e_sempre_acrescentado() {
        let mut ledger = ItemLedger::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        ledger.add_item(ItemKind::Servico, produto(a, "Limpeza", "50.00", 1));
        ledger.add_item(ItemKind::Servico, produto(b, "Limpeza", "50.00", 1));

        assert_eq!(ledger.servicos().len(), 2);
        assert_eq!(ledger.totals().total_servicos, dec("100.00"));
    }

    #[test]
    fn quantidade_zero_remove_o_item() {
        let id = Uuid::new_v4();
        let mut ledger = ItemLedger::default();
        ledger.add_item(ItemKind::Produto, produto(id, "Bateria", "120.00", 2));

        assert!(ledger.set_quantity(id, 0));
        assert!(ledger.is_empty());
    }

    #[test]
    fn editar_item_atualiza_nome_preco_quantidade() {
        let id = Uuid::new_v4();
        let mut ledger = ItemLedger::default();
        ledger.add_item(ItemKind::Produto, produto(id, "Bateria", "120.00", 1));

        assert!(ledger.edit_item(id, "Bateria original", dec("150.00"), 2));
        let item = &ledger.produtos()[0];
        assert_eq!(item.nome, "Bateria original");
        assert_eq!(item.total(), dec("300.00"));
    }

    #[test]
    fn faturado_respeita_o_desconto() {
        let mut ledger = ItemLedger::default();
        ledger.add_item(ItemKind::Produto, produto(Uuid::new_v4(), "Tela", "80.00", 1));
        ledger.add_item(ItemKind::Servico, produto(Uuid::new_v4(), "Troca de tela", "150.00", 1));

        let totais = ledger.totals();
        assert_eq!(totais.faturado(dec("30.00")), dec("200.00"));
        assert_eq!(totais.faturado(Decimal::ZERO), dec("230.00"));
    }

    // Cenário A da régua de aceitação: OS antiga, sem itens estruturados,
    // com texto e agregado legados de serviço.
    #[test]
    fn reserva_legada_quando_nao_ha_itens() {
        let legado = LegacyAggregates {
            servico: Some("Troca de tela".to_string()),
            valor_servico: dec("150.00"),
            qtd_servico: 1,
            ..Default::default()
        };
        let ledger = ItemLedger::from_rows(&[], legado);

        assert_eq!(ledger.totals().total_servicos, dec("150.00"));
        assert_eq!(ledger.totals().total_produtos, Decimal::ZERO);
        // A reconstrução também materializa o item sintético para edição.
        assert_eq!(ledger.servicos().len(), 1);
        assert_eq!(ledger.servicos()[0].nome, "Troca de tela");
    }

    #[test]
    fn reserva_legada_nao_se_aplica_com_itens_estruturados() {
        let legado = LegacyAggregates {
            valor_servico: dec("999.00"),
            qtd_servico: 1,
            servico: Some("antigo".to_string()),
            ..Default::default()
        };
        let mut ledger = ItemLedger {
            legado,
            ..Default::default()
        };
        ledger.add_item(ItemKind::Servico, produto(Uuid::new_v4(), "Reparo", "100.00", 1));

        assert_eq!(ledger.totals().total_servicos, dec("100.00"));
    }

    #[test]
    fn nome_legado_e_truncado_em_cinquenta() {
        let longo = "x".repeat(80);
        let legado = LegacyAggregates {
            peca: Some(longo),
            valor_peca: dec("10.00"),
            qtd_peca: 1,
            ..Default::default()
        };
        let ledger = ItemLedger::from_rows(&[], legado);

        let nome = &ledger.produtos()[0].nome;
        assert_eq!(nome.chars().count(), 53);
        assert!(nome.ends_with("..."));
    }

    #[test]
    fn serializacao_legada_segue_o_formato_antigo() {
        let mut ledger = ItemLedger::default();
        ledger.add_item(ItemKind::Produto, produto(Uuid::new_v4(), "Tela LCD", "80.00", 2));
        ledger.add_item(ItemKind::Servico, produto(Uuid::new_v4(), "Troca de tela", "150.00", 1));

        let (peca, servico) = ledger.to_legacy_text();
        assert_eq!(peca, "Tela LCD (2x) - R$ 160.00");
        assert_eq!(servico, "Troca de tela - R$ 150.00");
    }

    // Ida e volta: serializar para texto legado e reconstruir preserva o
    // valor total, ainda que os nomes individuais se percam.
    #[test]
    fn ida_e_volta_legada_preserva_o_total() {
        let mut ledger = ItemLedger::default();
        ledger.add_item(ItemKind::Produto, produto(Uuid::new_v4(), "Tela LCD", "80.00", 2));
        ledger.add_item(ItemKind::Produto, produto(Uuid::new_v4(), "Bateria", "120.00", 1));
        ledger.add_item(ItemKind::Servico, produto(Uuid::new_v4(), "Troca de tela", "150.00", 1));
        let totais = ledger.totals();

        let (peca, servico) = ledger.to_legacy_text();
        let legado = LegacyAggregates {
            peca: Some(peca),
            valor_peca: totais.total_produtos,
            qtd_peca: 1,
            servico: Some(servico),
            valor_servico: totais.total_servicos,
            qtd_servico: 1,
        };
        let reconstruido = ItemLedger::from_rows(&[], legado);

        assert_eq!(reconstruido.totals(), totais);
    }

    // Esvaziar o livro de propósito não ressuscita o agregado legado.
    #[test]
    fn remover_o_ultimo_item_zera_o_lado() {
        let id = Uuid::new_v4();
        let legado = LegacyAggregates {
            servico: Some("Troca de tela".to_string()),
            valor_servico: dec("150.00"),
            qtd_servico: 1,
            ..Default::default()
        };
        let mut ledger = ItemLedger::from_rows(&[], legado);
        assert_eq!(ledger.totals().total_servicos, dec("150.00"));

        let reconstruido_id = ledger.servicos()[0].id;
        assert!(ledger.remove_item(reconstruido_id));
        assert_eq!(ledger.totals().total_servicos, Decimal::ZERO);

        // O mesmo vale para um livro que nunca foi legado.
        let mut estruturado = ItemLedger::default();
        estruturado.add_item(ItemKind::Produto, produto(id, "Tela", "80.00", 1));
        assert!(estruturado.remove_item(id));
        assert_eq!(estruturado.totals().total_produtos, Decimal::ZERO);
    }

    #[test]
    fn tudo_vazio_reporta_zero() {
        let ledger = ItemLedger::from_rows(&[], LegacyAggregates::default());
        assert_eq!(ledger.totals().total_produtos, Decimal::ZERO);
        assert_eq!(ledger.totals().total_servicos, Decimal::ZERO);
        assert!(ledger.is_empty());
    }
}
