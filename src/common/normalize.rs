// src/common/normalize.rs
//
// Comparação de nomes de status digitados/cadastrados livremente: maiúsculas,
// sem acentos, espaços internos colapsados. Usada SOMENTE para casar um nome
// com a tabela de transição ou com o cadastro; o valor persistido permanece
// exatamente como exibido.

/// Normaliza um nome de status para comparação.
pub fn normalize_status(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(strip_diacritic(ch.to_ascii_uppercase()));
    }

    out
}

/// Dois nomes de status são o mesmo sob normalização?
pub fn status_eq(a: &str, b: &str) -> bool {
    normalize_status(a) == normalize_status(b)
}

// Dobra os acentos do português (latin-1) para a letra base.
fn strip_diacritic(ch: char) -> char {
    match ch {
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' | 'á' | 'à' | 'â' | 'ã' | 'ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' | 'é' | 'è' | 'ê' | 'ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' | 'í' | 'ì' | 'î' | 'ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' | 'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' | 'ú' | 'ù' | 'û' | 'ü' => 'U',
        'Ç' | 'ç' => 'C',
        'Ñ' | 'ñ' => 'N',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercases_and_strips_accents() {
        assert_eq!(normalize_status("Aguardando Aprovação"), "AGUARDANDO APROVACAO");
        assert_eq!(normalize_status("reparo concluído"), "REPARO CONCLUIDO");
        assert_eq!(normalize_status("EM EXECUÇÃO"), "EM EXECUCAO");
    }

    #[test]
    fn collapses_internal_whitespace_and_trims() {
        assert_eq!(normalize_status("  aguardando   peça "), "AGUARDANDO PECA");
        assert_eq!(normalize_status("entregue\t"), "ENTREGUE");
    }

    #[test]
    fn status_eq_ignores_case_and_accents() {
        assert!(status_eq("Aguardando Aprovação", "AGUARDANDO APROVACAO"));
        assert!(status_eq("orçamento  enviado", "ORCAMENTO ENVIADO"));
        assert!(!status_eq("APROVADO", "ENTREGUE"));
    }
}
