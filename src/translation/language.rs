//! Language tags and the heuristic source-language classifier.
//!
//! Tags follow the FLORES-200 `lang_Script` convention the translation backend
//! speaks. Classification never fails: ambiguous or untranslatable text resolves
//! to [`UNKNOWN`], undetectable text to [`EMPTY_TEXT_TAG`].

use anyhow::Result;

use crate::ui::Style;

pub const KOREAN: &str = "kor_Hang";
pub const ENGLISH: &str = "eng_Latn";
pub const JAPANESE: &str = "jpn_Jpan";
pub const CHINESE: &str = "zho_Hans";
pub const UNKNOWN: &str = "unknown";

/// Tag assigned to empty or whitespace-only text, and to text the statistical
/// detector cannot place.
pub const EMPTY_TEXT_TAG: &str = ENGLISH;

/// Above this share of loose Jamo among Hangul characters, Korean text is
/// treated as gibberish.
pub const DEFAULT_JAMO_RATIO_THRESHOLD: f64 = 0.30;

/// Supported language tags and their names.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("kor_Hang", "Korean"),
    ("eng_Latn", "English"),
    ("jpn_Jpan", "Japanese"),
    ("zho_Hans", "Chinese (Simplified)"),
    ("zho_Hant", "Chinese (Traditional)"),
    ("fra_Latn", "French"),
    ("deu_Latn", "German"),
    ("spa_Latn", "Spanish"),
    ("por_Latn", "Portuguese"),
    ("ita_Latn", "Italian"),
    ("rus_Cyrl", "Russian"),
    ("ukr_Cyrl", "Ukrainian"),
    ("vie_Latn", "Vietnamese"),
    ("tha_Thai", "Thai"),
    ("ind_Latn", "Indonesian"),
    ("tgl_Latn", "Tagalog"),
    ("arb_Arab", "Arabic"),
    ("hin_Deva", "Hindi"),
    ("tur_Latn", "Turkish"),
    ("nld_Latn", "Dutch"),
    ("pol_Latn", "Polish"),
];

/// Prints all supported language tags to stdout.
pub fn print_languages() {
    println!("{}", Style::header("Supported language tags"));
    for (code, name) in SUPPORTED_LANGUAGES {
        println!("  {:9} {}", Style::code(code), Style::secondary(name));
    }
}

/// Validates that the given language tag is supported.
///
/// # Errors
///
/// Returns an error if the tag is not in the supported list.
pub fn validate_language(lang: &str) -> Result<()> {
    if SUPPORTED_LANGUAGES.iter().any(|(code, _)| *code == lang) {
        Ok(())
    } else {
        anyhow::bail!(
            "Invalid language tag: '{lang}'\n\n\
             Valid tags look like: kor_Hang, eng_Latn, jpn_Jpan, zho_Hans, ...\n\
             Run 'transcache languages' to see all supported tags."
        )
    }
}

/// Maps a `whatlang` detection onto a canonical tag.
const fn tag_for(lang: whatlang::Lang) -> Option<&'static str> {
    use whatlang::Lang;

    let tag = match lang {
        Lang::Kor => KOREAN,
        Lang::Eng => ENGLISH,
        Lang::Jpn => JAPANESE,
        Lang::Cmn => CHINESE,
        Lang::Fra => "fra_Latn",
        Lang::Deu => "deu_Latn",
        Lang::Spa => "spa_Latn",
        Lang::Por => "por_Latn",
        Lang::Ita => "ita_Latn",
        Lang::Rus => "rus_Cyrl",
        Lang::Ukr => "ukr_Cyrl",
        Lang::Vie => "vie_Latn",
        Lang::Tha => "tha_Thai",
        Lang::Ind => "ind_Latn",
        Lang::Tgl => "tgl_Latn",
        Lang::Ara => "arb_Arab",
        Lang::Hin => "hin_Deva",
        Lang::Tur => "tur_Latn",
        Lang::Nld => "nld_Latn",
        Lang::Pol => "pol_Latn",
        _ => return None,
    };
    Some(tag)
}

const fn is_hangul_syllable(c: char) -> bool {
    matches!(c, '\u{AC00}'..='\u{D7A3}')
}

const fn is_hangul_jamo(c: char) -> bool {
    matches!(c, '\u{1100}'..='\u{11FF}' | '\u{3131}'..='\u{318E}')
}

const fn is_kana(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}')
}

/// Heuristic text → language tag classifier.
#[derive(Debug, Clone, Copy)]
pub struct LanguageClassifier {
    jamo_ratio_threshold: f64,
}

impl Default for LanguageClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_JAMO_RATIO_THRESHOLD)
    }
}

impl LanguageClassifier {
    pub const fn new(jamo_ratio_threshold: f64) -> Self {
        Self {
            jamo_ratio_threshold,
        }
    }

    /// Classifies `text`, always returning a tag.
    pub fn classify(&self, text: &str) -> &'static str {
        if text.trim().is_empty() {
            return EMPTY_TEXT_TAG;
        }

        let mut syllables = 0usize;
        let mut jamo = 0usize;
        let mut only_jamo_and_space = true;
        let mut has_kana = false;

        for c in text.chars() {
            if is_hangul_syllable(c) {
                syllables += 1;
                only_jamo_and_space = false;
            } else if is_hangul_jamo(c) {
                jamo += 1;
            } else {
                if !c.is_whitespace() {
                    only_jamo_and_space = false;
                }
                has_kana |= is_kana(c);
            }
        }

        if syllables > 0 {
            if jamo > 0 {
                let ratio = jamo as f64 / (jamo + syllables) as f64;
                if ratio > self.jamo_ratio_threshold {
                    return UNKNOWN;
                }
            }
            return KOREAN;
        }

        // Bare consonant/vowel runs such as "ㅋㅋㅋ" carry no translatable meaning.
        if jamo > 0 && only_jamo_and_space {
            return UNKNOWN;
        }

        if has_kana {
            return JAPANESE;
        }

        whatlang::detect_lang(text)
            .and_then(tag_for)
            .unwrap_or(EMPTY_TEXT_TAG)
    }
}

/// Classifies `text` with the default thresholds.
pub fn classify(text: &str) -> &'static str {
    LanguageClassifier::default().classify(text)
}
