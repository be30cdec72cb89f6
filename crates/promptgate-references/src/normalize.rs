//! Obfuscation normalization.
//!
//! Rewrites the text into a canonical form before any pattern matching runs.
//! Every rewrite that changes the text is evidence of obfuscation, which the
//! detector folds into its confidence score.

use regex::Regex;

/// A single regex rewrite rule.
struct Rewrite {
    pattern: Regex,
    replacement: &'static str,
}

/// Text normalizer for obfuscated references.
///
/// Applies, in order: control-character stripping, homoglyph folding,
/// punctuation-variant folding, then the regex rewrites (letter spacing,
/// bracketed tokens, defanged protocols, percent escapes).
pub struct Normalizer {
    rewrites: Vec<Rewrite>,
}

impl Normalizer {
    pub fn new() -> Self {
        let rules: &[(&str, &str)] = &[
            // Letter-spaced protocol/domain fragments
            (r"(?i)h\s*t\s*t\s*p", "http"),
            (r"(?i)w\s*w\s*w\s*\.", "www."),
            (r"(?i)\.\s*c\s*o\s*m", ".com"),
            (r"(?i)\.\s*o\s*r\s*g", ".org"),
            (r"(?i)\.\s*n\s*e\s*t", ".net"),
            // Bracketed obfuscation tokens
            (r"(?i)\[dot\]|\(dot\)|\{dot\}|<dot>", "."),
            (r"(?i)\[slash\]|\(slash\)|\{slash\}|<slash>", "/"),
            (r"(?i)\[colon\]|\(colon\)|\{colon\}|<colon>", ":"),
            (r"(?i)\[at\]|\(at\)|\{at\}|<at>", "@"),
            // Defanged protocols
            (r"(?i)hxxps", "https"),
            (r"(?i)hxxp", "http"),
            // Percent-encoded separators
            (r"(?i)%2F", "/"),
            (r"(?i)%3A", ":"),
            (r"(?i)%2E", "."),
        ];

        let rewrites = rules
            .iter()
            .map(|&(p, r)| Rewrite {
                pattern: Regex::new(p).unwrap(),
                replacement: r,
            })
            .collect();

        Self { rewrites }
    }

    /// Normalize `text`, returning the canonical form and whether any
    /// rewrite changed it.
    pub fn normalize(&self, text: &str) -> (String, bool) {
        let mut current = strip_invisible(text);
        let mut changed = current != text;

        let folded = fold_lookalikes(&current);
        if folded != current {
            changed = true;
            current = folded;
        }

        for rewrite in &self.rewrites {
            let next = rewrite.pattern.replace_all(&current, rewrite.replacement);
            if next != current {
                changed = true;
                current = next.into_owned();
            }
        }

        (current, changed)
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove zero-width and bidirectional control characters.
fn strip_invisible(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            !matches!(c,
                '\u{200B}'..='\u{200F}'
                | '\u{2028}'..='\u{202E}'
                | '\u{2060}'
                | '\u{FEFF}')
        })
        .collect()
}

/// Fold homoglyphs and punctuation look-alikes to plain ASCII.
fn fold_lookalikes(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    // Cyrillic look-alikes
    match c {
        'а' => return 'a',
        'о' => return 'o',
        'е' => return 'e',
        'р' => return 'p',
        'с' => return 'c',
        'х' => return 'x',
        'у' => return 'y',
        'і' => return 'i',
        'ј' => return 'j',
        'ѕ' => return 's',
        'А' => return 'A',
        'О' => return 'O',
        'Е' => return 'E',
        'Р' => return 'P',
        'С' => return 'C',
        'Х' => return 'X',
        'І' => return 'I',
        'Ѕ' => return 'S',
        _ => {}
    }

    // Greek look-alikes
    match c {
        'α' => return 'a',
        'ο' => return 'o',
        'ε' => return 'e',
        'ι' => return 'i',
        'κ' => return 'k',
        'ν' => return 'v',
        'ρ' => return 'p',
        'τ' => return 't',
        'υ' => return 'u',
        'Α' => return 'A',
        'Β' => return 'B',
        'Ε' => return 'E',
        'Ζ' => return 'Z',
        'Η' => return 'H',
        'Ι' => return 'I',
        'Κ' => return 'K',
        'Μ' => return 'M',
        'Ν' => return 'N',
        'Ο' => return 'O',
        'Ρ' => return 'P',
        'Τ' => return 'T',
        'Χ' => return 'X',
        _ => {}
    }

    // Punctuation variants
    match c {
        '․' | '‧' | '⁘' | '∙' | '•' | '·' => return '.',
        '⁄' | '∕' | '╱' | '⧸' | '／' => return '/',
        '：' | '﹕' => return ':',
        _ => {}
    }

    let code = c as u32;

    // Fullwidth ASCII block (U+FF01..=U+FF5E maps onto U+0021..=U+007E)
    if (0xFF01..=0xFF5E).contains(&code) {
        return char::from_u32(code - 0xFF00 + 0x20).unwrap_or(c);
    }

    // Mathematical alphanumeric symbols: letters cycle A-Z then a-z in
    // blocks of 52 starting at U+1D400; digits in blocks of 10 at U+1D7CE.
    if (0x1D400..=0x1D6A3).contains(&code) {
        let offset = (code - 0x1D400) % 52;
        let base = if offset < 26 { b'A' as u32 + offset } else { b'a' as u32 + offset - 26 };
        return char::from_u32(base).unwrap_or(c);
    }
    if (0x1D7CE..=0x1D7FF).contains(&code) {
        let offset = (code - 0x1D7CE) % 10;
        return char::from_u32(b'0' as u32 + offset).unwrap_or(c);
    }

    c
}
