//! Fluent-based localization for admin-facing messages.
//!
//! Resources live under `./locales/<lang>/main.ftl`. English is the fallback
//! for unsupported languages and missing keys.

use anyhow::Result;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, OnceLock};
use unic_langid::LanguageIdentifier;

const SUPPORTED_LANGUAGES: &[&str] = &["en", "it"];
const FALLBACK_LANGUAGE: &str = "en";

pub struct LocalizationManager {
    bundles: HashMap<String, Arc<FluentBundle<FluentResource>>>,
}

impl LocalizationManager {
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();
        for lang in SUPPORTED_LANGUAGES {
            let locale: LanguageIdentifier = lang.parse()?;
            let bundle = Self::create_bundle(&locale)?;
            bundles.insert(lang.to_string(), Arc::new(bundle));
        }
        Ok(Self { bundles })
    }

    fn create_bundle(locale: &LanguageIdentifier) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // No Unicode isolation marks around placeables; messages land in
        // plain-text chat bubbles.
        bundle.set_use_isolating(false);

        let resource_path = format!("./locales/{}/main.ftl", locale);
        if let Ok(content) = fs::read_to_string(&resource_path) {
            if let Ok(resource) = FluentResource::try_new(content) {
                let _ = bundle.add_resource(resource);
            }
        }

        Ok(bundle)
    }

    pub fn is_language_supported(&self, lang: &str) -> bool {
        self.bundles.contains_key(lang)
    }

    /// Resolve a message in the given language, falling back to English.
    pub fn get_message_in_language(
        &self,
        key: &str,
        lang: &str,
        args: Option<&FluentArgs>,
    ) -> String {
        let bundle = self
            .bundles
            .get(lang)
            .or_else(|| self.bundles.get(FALLBACK_LANGUAGE));
        let Some(bundle) = bundle else {
            return format!("Missing translation: {key}");
        };

        let message = bundle
            .get_message(key)
            .or_else(|| {
                // Missing key in a translation: retry against the fallback.
                self.bundles
                    .get(FALLBACK_LANGUAGE)
                    .and_then(|b| b.get_message(key))
            });
        let Some(message) = message else {
            return format!("Missing translation: {key}");
        };
        let Some(pattern) = message.value() else {
            return format!("Missing value for key: {key}");
        };

        let mut errors = vec![];
        bundle.format_pattern(pattern, args, &mut errors).to_string()
    }
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager. Safe to call more than once.
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_none() {
        let manager = LocalizationManager::new()?;
        let _ = LOCALIZATION_MANAGER.set(manager);
    }
    Ok(())
}

pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER
        .get()
        .expect("Localization manager not initialized")
}

/// Map a Telegram language code onto a supported language, stripping any
/// region subtag. Unsupported or absent codes fall back to English.
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let base = language_code
        .map(|code| code.split(['-', '_']).next().unwrap_or(code))
        .unwrap_or(FALLBACK_LANGUAGE);
    SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| **lang == base)
        .copied()
        .unwrap_or(FALLBACK_LANGUAGE)
}

/// Localized message in the detected language.
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    get_localization_manager().get_message_in_language(key, detect_language(language_code), None)
}

/// Localized message with arguments in the detected language.
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let fluent_args =
        FluentArgs::from_iter(args.iter().map(|(k, v)| (*k, FluentValue::from(*v))));
    get_localization_manager().get_message_in_language(
        key,
        detect_language(language_code),
        Some(&fluent_args),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(detect_language(Some("it")), "it");
        assert_eq!(detect_language(Some("it-IT")), "it");
        assert_eq!(detect_language(Some("en-US")), "en");
        assert_eq!(detect_language(Some("fr")), "en");
        assert_eq!(detect_language(None), "en");
    }

    #[test]
    fn test_missing_key_is_reported() {
        init_localization().unwrap();
        let manager = get_localization_manager();
        let msg = manager.get_message_in_language("no-such-key", "en", None);
        assert!(msg.contains("no-such-key"));
    }
}
