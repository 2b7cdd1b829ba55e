//! Message catalog for user-facing texts
//!
//! Texts are indexed by (locale, key) and loaded once at startup from JSON
//! catalogs embedded in the binary. Lookup falls back to the default locale
//! and finally to the key itself, so a missing translation degrades to
//! something greppable instead of a crash.
//!
//! The catalog lives entirely outside the ledger core; handlers format
//! outcomes, the ledger never builds user-visible strings.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

const EN: &str = include_str!("en.json");
const RU: &str = include_str!("ru.json");

#[derive(Debug, Deserialize)]
struct Catalog {
    messages: HashMap<String, String>,
    buttons: HashMap<String, String>,
}

pub struct Translator {
    locales: HashMap<String, Catalog>,
    default_locale: String,
}

impl Translator {
    /// Parse the embedded catalogs. Fails fast on malformed JSON so a broken
    /// catalog is caught at startup, not mid-conversation.
    pub fn load(default_locale: &str) -> Result<Self> {
        let mut locales = HashMap::new();
        for (lang, raw) in [("en", EN), ("ru", RU)] {
            let catalog: Catalog = serde_json::from_str(raw)
                .with_context(|| format!("malformed locale catalog: {}", lang))?;
            locales.insert(lang.to_string(), catalog);
        }
        Ok(Self {
            locales,
            default_locale: default_locale.to_string(),
        })
    }

    /// Message text with `{param}` substitution
    pub fn message(&self, lang: &str, key: &str, params: &[(&str, &str)]) -> String {
        let template = self
            .lookup(lang, key, |c| &c.messages)
            .unwrap_or_else(|| key.to_string());
        substitute(&template, params)
    }

    /// Button label
    pub fn button(&self, lang: &str, key: &str) -> String {
        self.lookup(lang, key, |c| &c.buttons)
            .unwrap_or_else(|| key.to_string())
    }

    fn lookup(
        &self,
        lang: &str,
        key: &str,
        section: impl Fn(&Catalog) -> &HashMap<String, String>,
    ) -> Option<String> {
        self.locales
            .get(lang)
            .and_then(|c| section(c).get(key))
            .or_else(|| {
                self.locales
                    .get(&self.default_locale)
                    .and_then(|c| section(c).get(key))
            })
            .cloned()
    }
}

fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in params {
        out = out.replace(&format!("{{{}}}", name), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogs_parse() {
        let t = Translator::load("ru").unwrap();
        assert!(!t.message("en", "welcome", &[]).is_empty());
        assert!(!t.message("ru", "welcome", &[]).is_empty());
    }

    #[test]
    fn test_substitution() {
        let t = Translator::load("ru").unwrap();
        let text = t.message("en", "current_balance", &[("value", "42.50")]);
        assert!(text.contains("42.50"));
    }

    #[test]
    fn test_unknown_locale_falls_back_to_default() {
        let t = Translator::load("ru").unwrap();
        assert_eq!(t.message("de", "welcome", &[]), t.message("ru", "welcome", &[]));
    }

    #[test]
    fn test_unknown_key_degrades_to_key() {
        let t = Translator::load("ru").unwrap();
        assert_eq!(t.message("en", "no_such_key", &[]), "no_such_key");
        assert_eq!(t.button("en", "no_such_button"), "no_such_button");
    }

    #[test]
    fn test_catalogs_have_matching_keys() {
        let t = Translator::load("ru").unwrap();
        let en = &t.locales["en"];
        let ru = &t.locales["ru"];
        for key in en.messages.keys() {
            assert!(ru.messages.contains_key(key), "ru missing message {}", key);
        }
        for key in ru.messages.keys() {
            assert!(en.messages.contains_key(key), "en missing message {}", key);
        }
        for key in en.buttons.keys() {
            assert!(ru.buttons.contains_key(key), "ru missing button {}", key);
        }
        for key in ru.buttons.keys() {
            assert!(en.buttons.contains_key(key), "en missing button {}", key);
        }
    }
}
