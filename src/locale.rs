//! Canonical target-locale table for the dubbing service.
//!
//! The backend historically accepted either a short code ("fr"), a service
//! locale ("fr_FR"), or a display name ("French") depending on the call
//! site. Everything in this crate resolves user input to a single `Locale`
//! up front and passes that around instead.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    /// Short selection code, e.g. "fr".
    pub short: &'static str,
    /// Locale identifier the dubbing service expects, e.g. "fr_FR".
    pub service_code: &'static str,
    /// Default voice id for this locale.
    pub voice: &'static str,
    /// Human-readable language name.
    pub name: &'static str,
}

pub const LOCALES: &[Locale] = &[
    Locale { short: "fr", service_code: "fr_FR", voice: "fr-FR-theo", name: "French" },
    Locale { short: "de", service_code: "de_DE", voice: "de-DE-marcus", name: "German" },
    Locale { short: "es", service_code: "es_ES", voice: "es-ES-maria", name: "Spanish" },
    Locale { short: "hi", service_code: "hi_IN", voice: "hi-IN-priya", name: "Hindi" },
    Locale { short: "ja", service_code: "ja_JP", voice: "ja-JP-hiro", name: "Japanese" },
    Locale { short: "en", service_code: "en_US", voice: "en-US-marcus", name: "English" },
    Locale { short: "ko", service_code: "ko_KR", voice: "ko-KR-minjun", name: "Korean" },
    Locale { short: "zh", service_code: "zh_CN", voice: "zh-CN-xiaoyu", name: "Chinese" },
];

impl Locale {
    /// Resolve user input to a canonical locale. Accepts the short code,
    /// the service locale code, or the display name, case-insensitively.
    pub fn resolve(input: &str) -> Option<&'static Locale> {
        let needle = input.trim().to_lowercase();
        LOCALES.iter().find(|l| {
            l.short == needle
                || l.service_code.to_lowercase() == needle
                || l.name.to_lowercase() == needle
        })
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.service_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_short_code() {
        assert_eq!(Locale::resolve("fr").unwrap().service_code, "fr_FR");
    }

    #[test]
    fn resolves_service_code_and_name() {
        assert_eq!(Locale::resolve("ja_JP").unwrap().short, "ja");
        assert_eq!(Locale::resolve("German").unwrap().service_code, "de_DE");
    }

    #[test]
    fn resolve_is_case_insensitive_and_trims() {
        assert_eq!(Locale::resolve(" KO_kr ").unwrap().short, "ko");
        assert_eq!(Locale::resolve("spanish").unwrap().short, "es");
    }

    #[test]
    fn unknown_input_is_none() {
        assert!(Locale::resolve("tlh").is_none());
        assert!(Locale::resolve("").is_none());
    }
}
