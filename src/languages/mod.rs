use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// ISO 639-1 codes and their English names.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    codes: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn load() -> Result<Self> {
        let raw = include_str!("iso_639_1.json");
        let parsed: IsoData =
            serde_json::from_str(raw).with_context(|| "failed to parse ISO 639-1 language data")?;
        Ok(LanguageRegistry {
            codes: parsed.codes,
        })
    }

    /// Accepts a bare code (`pt`) or a code with a region or script
    /// suffix (`pt-BR`, `zh_Hant`).
    pub fn is_valid_code(&self, code: &str) -> bool {
        let base = base_code(code);
        base.len() == 2 && self.codes.contains_key(&base)
    }

    pub fn iso_name(&self, code: &str) -> Option<String> {
        self.codes.get(&base_code(code)).cloned()
    }

    /// `"fr (French)"`, or the code alone when it is not an ISO code.
    pub fn display(&self, code: &str) -> String {
        match self.iso_name(code) {
            Some(name) => format!("{} ({})", code, name),
            None => code.to_string(),
        }
    }
}

fn base_code(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

#[derive(Debug, Deserialize)]
struct IsoData {
    codes: HashMap<String, String>,
}
