//! Backend rejection phrases mapped to operator-facing Spanish text.
//!
//! The table is data: the default ships in `data/checkin_phrases.es.json`
//! and can be replaced at runtime with a file of the same shape.

use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

const DEFAULT_PHRASES: &str = include_str!("../data/checkin_phrases.es.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseRule {
    pub pattern: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translation {
    Known(String),
    Unrecognized(String),
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Translation::Known(message) => write!(f, "{}", message),
            Translation::Unrecognized(raw) => write!(f, "Error no reconocido: {}", raw),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhraseTable {
    rules: Vec<PhraseRule>,
}

impl Default for PhraseTable {
    fn default() -> Self {
        // The embedded table is validated by tests.
        Self::from_json(DEFAULT_PHRASES).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Embedded phrase table is invalid");
            Self { rules: Vec::new() }
        })
    }
}

impl PhraseTable {
    pub fn new(rules: Vec<PhraseRule>) -> Self {
        Self { rules }
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(raw)?))
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read phrase table {}: {}", path.display(), e))?;
        Ok(Self::from_json(&raw)?)
    }

    pub fn rules(&self) -> &[PhraseRule] {
        &self.rules
    }

    /// Exact match over the whole table first, then the first rule whose
    /// pattern occurs case-insensitively in `raw`.
    pub fn translate(&self, raw: &str) -> Translation {
        let trimmed = raw.trim();
        if let Some(rule) = self.rules.iter().find(|rule| rule.pattern == trimmed) {
            return Translation::Known(rule.message.clone());
        }

        let lowered = trimmed.to_lowercase();
        self.rules
            .iter()
            .find(|rule| !rule.pattern.is_empty() && lowered.contains(&rule.pattern.to_lowercase()))
            .map(|rule| Translation::Known(rule.message.clone()))
            .unwrap_or_else(|| Translation::Unrecognized(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses() {
        assert!(PhraseTable::from_json(DEFAULT_PHRASES).is_ok());
        assert!(!PhraseTable::default().rules().is_empty());
    }

    #[test]
    fn exact_match_wins() {
        let table = PhraseTable::default();
        assert_eq!(
            table.translate("Guest has already checked in for this session"),
            Translation::Known("Esta persona ya realizó check-in en esta sesión.".into())
        );
        assert_eq!(
            table.translate("Registrant or session not found"),
            Translation::Known("Solicitud inválida. El registrante o la sesión no existen.".into())
        );
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let table = PhraseTable::default();
        assert_eq!(
            table.translate("GUEST IS NOT REGISTERED in event"),
            Translation::Known("Esta persona no está registrada en este evento o sesión.".into())
        );
        assert_eq!(
            table.translate("Ticket category does not match this entry point"),
            Translation::Known(
                "La categoría de la entrada no es válida para este punto de acceso.".into()
            )
        );
        assert_eq!(
            table.translate("Checkin not found"),
            Translation::Known("No se encontró a esta persona en el registro.".into())
        );
    }

    #[test]
    fn exact_match_beats_earlier_substring_rule() {
        let table = PhraseTable::new(vec![
            PhraseRule {
                pattern: "found".into(),
                message: "generic".into(),
            },
            PhraseRule {
                pattern: "Guest not found".into(),
                message: "specific".into(),
            },
        ]);
        assert_eq!(table.translate("Guest not found"), Translation::Known("specific".into()));
        assert_eq!(table.translate("Event not found"), Translation::Known("generic".into()));
    }

    #[test]
    fn unknown_message_is_wrapped_not_dropped() {
        let table = PhraseTable::default();
        let translation = table.translate("Some new backend error");
        assert_eq!(translation, Translation::Unrecognized("Some new backend error".into()));
        assert_eq!(translation.to_string(), "Error no reconocido: Some new backend error");
    }

    #[test]
    fn table_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phrases.json");
        fs::write(&path, r#"[{"pattern":"boom","message":"explotó"}]"#).unwrap();
        let table = PhraseTable::from_path(&path).unwrap();
        assert_eq!(table.translate("BOOM!"), Translation::Known("explotó".into()));
        assert!(PhraseTable::from_path(dir.path().join("missing.json")).is_err());
    }
}
