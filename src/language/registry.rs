//! Language registry: display metadata for the languages offered to users.
//!
//! Initialized once through `OnceLock` and immutable afterwards.

use std::sync::OnceLock;

/// Display metadata for one language.
#[derive(Debug, Clone)]
pub struct LanguageInfo {
    /// ISO 639-1 language code (e.g., "en", "fr")
    pub code: &'static str,

    /// English name of the language (e.g., "French")
    pub name: &'static str,

    /// Native name of the language (e.g., "Français")
    pub native_name: &'static str,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageInfo>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Look up a language by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageInfo> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    /// All languages, in display order.
    pub fn list_all(&self) -> &[LanguageInfo] {
        &self.languages
    }
}

/// Languages offered by the language picker.
fn default_languages() -> Vec<LanguageInfo> {
    vec![
        LanguageInfo {
            code: "en",
            name: "English",
            native_name: "English",
        },
        LanguageInfo {
            code: "hi",
            name: "Hindi",
            native_name: "हिन्दी",
        },
        LanguageInfo {
            code: "es",
            name: "Spanish",
            native_name: "Español",
        },
        LanguageInfo {
            code: "pt",
            name: "Portuguese",
            native_name: "Português",
        },
        LanguageInfo {
            code: "zh",
            name: "Chinese",
            native_name: "中文",
        },
        LanguageInfo {
            code: "fr",
            name: "French",
            native_name: "Français",
        },
    ]
}
