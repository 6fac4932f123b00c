//! Lightweight Spanish detection.
//!
//! Words are scored against a small Spanish lexicon and a small lexicon of common
//! English and Portuguese words. A message is rejected only when foreign words
//! outnumber Spanish ones, so bare amounts ("25") and single category replies
//! ("comida") always pass.

/// Common Spanish function words and finance vocabulary (accents folded)
const SPANISH_WORDS: &[&str] = &[
    "de", "la", "el", "en", "y", "que", "los", "las", "un", "una", "por", "para", "con", "mi",
    "me", "se", "lo", "al", "del", "es", "hoy", "ayer", "anteayer", "gasto", "gastos", "gaste",
    "ingreso", "ingresos", "pague", "compre", "recibi", "cobre", "gane", "pagaron", "soles", "sol",
    "lucas", "monto", "reporte", "semanal", "mensual", "anual", "codigo", "ayuda", "hola",
    "gracias", "comida", "diversion", "ropa", "transporte", "salud", "vivienda", "servicios",
    "educacion", "ahorro", "otros", "salario", "sueldo", "regalos", "almuerzo", "cena", "desayuno",
    "pasaje", "mercado", "cuanto", "cuando", "semana", "mes", "ano", "año", "dame", "quiero", "registrar",
    "nombre", "si", "no", "pero", "como", "este", "esta", "mis", "su", "tu",
];

/// Frequent English and Portuguese words that never appear in Spanish messages
const FOREIGN_WORDS: &[&str] = &[
    // English
    "the", "and", "for", "on", "of", "with", "my", "i", "spent", "paid", "bought", "expense",
    "income", "today", "yesterday", "food", "dollars", "to", "is", "it", "this", "that", "you",
    "please", "hello", "hi", "what", "how", "report", "code", "help", "money", "lunch", "dinner",
    "salary", "got", "received", "was", "at", "weekly", "monthly", "yearly", "from", "bucks",
    // Portuguese
    "voce", "obrigado", "obrigada", "hoje", "ontem", "gastei", "comprei", "com", "nao", "uma",
    "reais", "almoco", "paguei", "recebi", "dinheiro",
];

/// Folds Spanish accents and lowercases, so "Gasté" and "gaste" compare equal.
#[must_use]
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Splits folded text into alphabetic words ('ñ' included).
pub fn words(folded: &str) -> impl Iterator<Item = &str> {
    folded
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
}

/// Returns `true` when the message reads as Spanish (or carries no words at all).
#[must_use]
pub fn is_spanish(text: &str) -> bool {
    // Characters only Spanish uses among the candidate languages
    let mut spanish = text
        .chars()
        .filter(|c| matches!(c, 'ñ' | 'Ñ' | '¿' | '¡'))
        .count();
    let mut foreign = text.chars().filter(|c| matches!(c, 'ã' | 'õ' | 'ç')).count();

    let folded = fold(text);
    for word in words(&folded) {
        if SPANISH_WORDS.contains(&word) {
            spanish += 1;
        } else if FOREIGN_WORDS.contains(&word) {
            foreign += 1;
        }
    }

    foreign <= spanish
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold() {
        assert_eq!(fold("Gasté S/25 en Diversión"), "gaste s/25 en diversion");
        assert_eq!(fold("AÑO"), "año");
    }

    #[test]
    fn test_spanish_messages_pass() {
        assert!(is_spanish("gasto S/25 en comida ayer"));
        assert!(is_spanish("Me pagaron 3000 de sueldo"));
        assert!(is_spanish("¿cuánto gasté?"));
        assert!(is_spanish("reporte semanal"));
    }

    #[test]
    fn test_wordless_and_single_words_pass() {
        assert!(is_spanish("25"));
        assert!(is_spanish("S/ 40.50"));
        assert!(is_spanish("comida"));
        assert!(is_spanish("mercado"));
    }

    #[test]
    fn test_english_rejected() {
        assert!(!is_spanish("I spent 25 soles on food yesterday"));
        assert!(!is_spanish("paid 20 for lunch today"));
        assert!(!is_spanish("hello"));
        assert!(!is_spanish("weekly report please"));
    }

    #[test]
    fn test_portuguese_rejected() {
        assert!(!is_spanish("gastei 30 reais hoje com almoço"));
    }
}
