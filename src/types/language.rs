use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Writing direction of a language.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    /// Left to right.
    Ltr,
    /// Right to left.
    Rtl,
}

/// A language the assistant can speak.
///
/// The code is sent to the backend with every request and selects the copy
/// shown by the widget.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    /// French, the default.
    #[default]
    Fr,
    /// English.
    En,
    /// Arabic (Tunisian locale).
    Ar,
}

impl LanguageCode {
    /// All supported languages in display order.
    pub const ALL: [LanguageCode; 3] = [LanguageCode::Fr, LanguageCode::En, LanguageCode::Ar];

    /// The two-letter code as sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            LanguageCode::Fr => "fr",
            LanguageCode::En => "en",
            LanguageCode::Ar => "ar",
        }
    }

    /// The language's own name for itself.
    pub fn name(&self) -> &'static str {
        match self {
            LanguageCode::Fr => "Français",
            LanguageCode::En => "English",
            LanguageCode::Ar => "العربية",
        }
    }

    pub fn flag(&self) -> &'static str {
        match self {
            LanguageCode::Fr => "🇫🇷",
            LanguageCode::En => "🇬🇧",
            LanguageCode::Ar => "🇹🇳",
        }
    }

    /// Greeting shown as the first assistant message of a conversation.
    pub fn welcome(&self) -> &'static str {
        match self {
            LanguageCode::Fr => {
                "Bienvenue. Je suis Nomadia. Explorez l'élégance et l'histoire de la Tunisie."
            }
            LanguageCode::En => {
                "Welcome. I am Nomadia. Explore the elegance and history of Tunisia."
            }
            LanguageCode::Ar => "مرحباً. أنا نوماديا. استكشف فخامة وتاريخ تونس.",
        }
    }

    /// Hint displayed in the empty input field.
    pub fn placeholder(&self) -> &'static str {
        match self {
            LanguageCode::Fr => "Posez votre question...",
            LanguageCode::En => "Ask a question...",
            LanguageCode::Ar => "اطرح سؤالاً...",
        }
    }

    pub fn direction(&self) -> TextDirection {
        match self {
            LanguageCode::Ar => TextDirection::Rtl,
            LanguageCode::Fr | LanguageCode::En => TextDirection::Ltr,
        }
    }

    /// Locale tag handed to the dictation capability.
    pub fn speech_locale(&self) -> &'static str {
        match self {
            LanguageCode::Fr => "fr-FR",
            LanguageCode::En => "en-US",
            LanguageCode::Ar => "ar-TN",
        }
    }

    /// Text delivered in place of a reply when the backend cannot be reached.
    pub fn connection_diagnostic(&self) -> &'static str {
        match self {
            LanguageCode::Fr => {
                "⚠️ Erreur de connexion au Cerveau Nomadia. Assurez-vous que le serveur backend est lancé sur le port 8000."
            }
            LanguageCode::En => {
                "⚠️ Could not reach the Nomadia backend. Make sure the backend server is running on port 8000."
            }
            LanguageCode::Ar => {
                "⚠️ تعذر الاتصال بخادم نوماديا. تأكد من تشغيل الخادم على المنفذ 8000."
            }
        }
    }

    /// Notice shown once when the host offers no dictation.
    pub fn speech_unsupported_notice(&self) -> &'static str {
        match self {
            LanguageCode::Fr => "Votre navigateur ne supporte pas la reconnaissance vocale.",
            LanguageCode::En => "Speech recognition is not supported on this device.",
            LanguageCode::Ar => "التعرف على الصوت غير مدعوم على هذا الجهاز.",
        }
    }

    /// Notice shown when microphone access was refused.
    pub fn microphone_denied_notice(&self) -> &'static str {
        match self {
            LanguageCode::Fr => {
                "Accès au microphone refusé. Veuillez vérifier les permissions de votre navigateur."
            }
            LanguageCode::En => "Microphone access denied. Please check your permissions.",
            LanguageCode::Ar => "تم رفض الوصول إلى الميكروفون. يرجى التحقق من الأذونات.",
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error returned when parsing an unsupported language code.
#[derive(Debug)]
pub struct LanguageCodeParseError {
    /// The invalid string value that could not be parsed.
    pub invalid_value: String,
}

impl fmt::Display for LanguageCodeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown language: {} (expected fr, en or ar)",
            self.invalid_value
        )
    }
}

impl std::error::Error for LanguageCodeParseError {}

impl FromStr for LanguageCode {
    type Err = LanguageCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fr" => Ok(LanguageCode::Fr),
            "en" => Ok(LanguageCode::En),
            "ar" => Ok(LanguageCode::Ar),
            _ => Err(LanguageCodeParseError {
                invalid_value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn serializes_as_lowercase_code() {
        assert_eq!(to_value(LanguageCode::Fr).unwrap(), json!("fr"));
        assert_eq!(to_value(LanguageCode::En).unwrap(), json!("en"));
        assert_eq!(to_value(LanguageCode::Ar).unwrap(), json!("ar"));
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("FR".parse::<LanguageCode>().unwrap(), LanguageCode::Fr);
        assert_eq!(" en ".parse::<LanguageCode>().unwrap(), LanguageCode::En);
        assert_eq!("ar".parse::<LanguageCode>().unwrap(), LanguageCode::Ar);
        let err = "de".parse::<LanguageCode>().unwrap_err();
        assert!(err.to_string().contains("de"));
    }

    #[test]
    fn speech_locales() {
        assert_eq!(LanguageCode::Fr.speech_locale(), "fr-FR");
        assert_eq!(LanguageCode::En.speech_locale(), "en-US");
        assert_eq!(LanguageCode::Ar.speech_locale(), "ar-TN");
    }

    #[test]
    fn only_arabic_is_right_to_left() {
        for language in LanguageCode::ALL {
            let expected = if language == LanguageCode::Ar {
                TextDirection::Rtl
            } else {
                TextDirection::Ltr
            };
            assert_eq!(language.direction(), expected);
        }
    }

    #[test]
    fn every_language_has_copy() {
        for language in LanguageCode::ALL {
            assert!(!language.welcome().is_empty());
            assert!(!language.placeholder().is_empty());
            assert!(!language.connection_diagnostic().is_empty());
            assert!(!language.speech_unsupported_notice().is_empty());
        }
    }
}
