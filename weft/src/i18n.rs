//! Translator seam and the per-(rule, locale) translation cache.
//!
//! The actual lookup machinery is an external collaborator; the core only
//! needs a handle it can find in the context under [`I18N_KEY`] and a
//! memoized way to obtain a translated rule.

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::bot::dispatch::context::{Context, I18N_KEY};
use crate::rules::ArcRule;

/// Locale-bound text lookup. Implementations are supplied by the
/// application (or an i18n middleware) and installed into the context.
pub trait Translator: Send + Sync {
    fn locale(&self) -> &str;

    /// Translates a human-readable rule literal.
    fn translate(&self, text: &str) -> String;
}

/// Shared translator handle as stored in the context.
pub type ArcTranslator = Arc<dyn Translator>;

impl Context {
    /// The translator installed for this update, if any.
    pub fn translator(&self) -> Option<ArcTranslator> {
        self.get::<ArcTranslator>(I18N_KEY).map(|t| (*t).clone())
    }

    pub fn set_translator(&mut self, translator: ArcTranslator) {
        self.set(I18N_KEY, translator);
    }
}

static TRANSLATED_RULES: Lazy<DashMap<(usize, String), ArcRule>> = Lazy::new(DashMap::new);

fn rule_identity(rule: &ArcRule) -> usize {
    Arc::as_ptr(rule) as *const () as usize
}

/// Translated form of `rule` for the translator's locale.
///
/// Memoized per (rule instance, locale): repeated calls return the same
/// rule object. Untranslatable rules are returned as-is and not cached.
pub fn translate_rule(rule: &ArcRule, translator: &dyn Translator) -> ArcRule {
    let key = (rule_identity(rule), translator.locale().to_string());
    if let Some(cached) = TRANSLATED_RULES.get(&key) {
        return cached.clone();
    }
    match rule.translate(translator) {
        Some(translated) => {
            TRANSLATED_RULES.insert(key, translated.clone());
            translated
        }
        None => rule.clone(),
    }
}
