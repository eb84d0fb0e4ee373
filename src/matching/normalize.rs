//! Name folding.
//!
//! Display names are user-edited and decorated. Comparison happens on a folded
//! form: lowercase, fullwidth forms narrowed, accented and look-alike letters
//! mapped to their plain Latin counterpart.

/// Maps a single lowercase character to its plain Latin look-alike.
fn fold_char(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' | 'α' | 'а' | 'ᴀ' => 'a',
        'β' | 'в' | 'ʙ' => 'b',
        'ç' | 'ć' | 'č' | 'с' | 'ᴄ' => 'c',
        'ď' | 'đ' | 'ᴅ' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' | 'ε' | 'е' | 'ё' | 'ᴇ' => 'e',
        'ğ' | 'ɢ' => 'g',
        'н' | 'ʜ' => 'h',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ı' | 'ι' | 'і' | 'ɪ' => 'i',
        'ј' | 'ᴊ' => 'j',
        'κ' | 'к' | 'ᴋ' => 'k',
        'ł' | 'ʟ' => 'l',
        'м' | 'ᴍ' => 'm',
        'ñ' | 'ń' | 'ň' | 'η' | 'ɴ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ο' | 'о' | 'ᴏ' => 'o',
        'ρ' | 'р' | 'ᴘ' => 'p',
        'ř' | 'ʀ' => 'r',
        'ś' | 'š' | 'ş' | 'ѕ' | 'ꜱ' => 's',
        'ť' | 'τ' | 'т' | 'ᴛ' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'υ' | 'ᴜ' => 'u',
        'ν' | 'ᴠ' => 'v',
        'ω' | 'ᴡ' => 'w',
        'χ' | 'х' => 'x',
        'ý' | 'ÿ' | 'у' | 'ʏ' => 'y',
        'ź' | 'ż' | 'ž' | 'ᴢ' => 'z',
        other => other,
    }
}

/// Narrows fullwidth ASCII variants (U+FF01..=U+FF5E) to ASCII.
fn narrow(c: char) -> char {
    let code = u32::from(c);
    if (0xFF01..=0xFF5E).contains(&code) {
        char::from_u32(code - 0xFEE0).unwrap_or(c)
    } else {
        c
    }
}

/// Folds a string for comparison, keeping punctuation and spacing.
///
/// # Examples
///
/// ```
/// use rostermerge::matching::normalize::fold;
///
/// assert_eq!(fold("ＪÁne"), "jane");
/// ```
#[must_use]
pub fn fold(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(narrow)
        .flat_map(char::to_lowercase)
        .map(fold_char)
        .collect()
}

/// Folds a name and drops everything that is not a letter or digit.
///
/// Names made only of symbols keep their folded form (whitespace collapsed)
/// so they can still be compared.
///
/// # Examples
///
/// ```
/// use rostermerge::matching::normalize::normalize_name;
///
/// assert_eq!(normalize_name("  Jané_D. "), "janed");
/// assert_eq!(normalize_name("★ ☆"), "★ ☆");
/// ```
#[must_use]
pub fn normalize_name(value: &str) -> String {
    let folded = fold(value);
    let squashed: String = folded.chars().filter(|c| c.is_alphanumeric()).collect();
    if squashed.is_empty() {
        folded.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        squashed
    }
}
