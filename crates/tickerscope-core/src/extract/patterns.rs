//! Common regex patterns for label and value extraction.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Inline `Label: value` runs. The label must start a word and cannot start
    // with a digit; the separator is a colon or a spaced dash.
    pub static ref INLINE_LABEL: Regex = Regex::new(
        r"(?:^|[\s;|•·,(])(?P<label>[A-Za-z][A-Za-z0-9 &/().%'#\-]{0,39}?)\s*(?P<sep>:|\s[-–—]\s)"
    ).unwrap();

    // Leading numeric token (sign, thousands separators, decimals).
    pub static ref NUMBER_TOKEN: Regex = Regex::new(
        r"[-+]?(?:\d[\d,]*(?:\.\d+)?|\.\d+)"
    ).unwrap();

    // First number with an optional magnitude suffix, after symbols and
    // separators are stripped.
    pub static ref SCALED_NUMBER: Regex = Regex::new(
        r"(?i)(?P<sign>-)?(?P<num>\d+(?:\.\d+)?|\.\d+)\s*(?P<suffix>thousand|million|billion|trillion|mln|mm|bn|k|m|b|t)?\b"
    ).unwrap();

    // Unit words that may trail a share count.
    pub static ref SHARE_UNITS: Regex = Regex::new(
        r"(?i)\b(?:shares?|shs|sh|units?|contracts?|vol(?:ume)?)\b\.?"
    ).unwrap();

    // Currency codes that may prefix or trail an amount.
    pub static ref CURRENCY_CODES: Regex = Regex::new(
        r"(?i)\b(?:usd|us\$|cad|eur|gbp)\b"
    ).unwrap();

    // Columns that always carry data.
    pub static ref DATE_HEADER: Regex = Regex::new(
        r"(?i)\b(?:date|time|timestamp|as of|period|updated|settlement)\b"
    ).unwrap();

    // Columns that never carry data.
    pub static ref NON_DATA_HEADER: Regex = Regex::new(
        r"(?i)\b(?:label|labels|description|desc|notes?|comments?|remarks?|explanation|definition)\b"
    ).unwrap();

    // Phrases that mark a value as explanation rather than data.
    pub static ref DISCURSIVE: Regex = Regex::new(
        r"(?i)\b(?:this means|which means|refers to|is calculated|is defined as|in other words|for example|note that|indicates that|represents the|is the number of|is the total|we (?:believe|estimate)|you (?:can|should))\b"
    ).unwrap();

    // End of a sentence-like clause.
    pub static ref CLAUSE_BREAK: Regex = Regex::new(
        r"[.!?;](?:\s+|$)"
    ).unwrap();

    // Keywords that make a non-numeric value look like financial data.
    pub static ref UNIT_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:shares?|days?|volume|rate|float|borrow\w*|exempt|deliver\w*)\b"
    ).unwrap();

    // Currency or percent symbols.
    pub static ref MONEY_OR_PERCENT: Regex = Regex::new(
        r"[$€£¥%]"
    ).unwrap();

    // A short alphabetic token such as "N/A", "Yes" or "NASDAQ".
    pub static ref ALPHA_TOKEN: Regex = Regex::new(
        r"^[A-Za-z][A-Za-z .&'/\-]*$"
    ).unwrap();

    // Anything that is not a letter or digit, for key normalization.
    pub static ref NON_ALNUM: Regex = Regex::new(
        r"[^a-z0-9]+"
    ).unwrap();
}
