use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Folds text into the form both queries and catalog spellings are compared
/// in: lowercase, single-spaced, and optionally without diacritics
/// (`Äpfel` → `apfel`, `Straße` → `strasse`).
pub fn normalize(text: &str, strip_diacritics: bool) -> String {
    let lowered = text.to_lowercase();
    let folded: String = if strip_diacritics {
        lowered.replace('ß', "ss").nfd().filter(|ch| !is_combining_mark(*ch)).collect()
    } else {
        lowered.nfc().collect()
    };

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}
