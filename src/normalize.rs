use unicode_normalization::UnicodeNormalization;

const RIGHT_SINGLE_QUOTATION_MARK: char = '\u{2019}';

/// NFKC, then the typographic apostrophe becomes ASCII `'`.
pub fn normalize_title(raw: &str) -> String {
    raw.nfkc()
        .map(|character| {
            if character == RIGHT_SINGLE_QUOTATION_MARK {
                '\''
            } else {
                character
            }
        })
        .collect()
}
