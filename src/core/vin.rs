// VinSplit - core/vin.rs
//
// VIN and engine-number text rules shared by schema detection and row
// normalisation: canonical form, placeholder recognition, VIN shape checks,
// and splitting of composite ENGINE-VIN cells.

use crate::util::constants;
use regex::Regex;
use std::sync::OnceLock;

/// One ENGINE-VIN pair taken from a composite cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineVin {
    pub engine: Option<String>,
    /// Canonical VIN; may be empty or a placeholder, callers decide.
    pub vin: String,
}

/// Trimmed, upper-cased VIN. Inner whitespace is kept.
pub fn canonical_vin(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// True when a canonical VIN is a stand-in for "no VIN".
///
/// Matches the configured placeholder words and any value made only of
/// zeros, dashes, asterisks, dots, slashes, and spaces.
pub fn is_placeholder(vin: &str) -> bool {
    if vin.is_empty() {
        return false;
    }
    constants::VIN_PLACEHOLDERS.contains(&vin)
        || vin
            .chars()
            .all(|c| matches!(c, '0' | '-' | '*' | '.' | '/' | ' ' | '_'))
}

/// ISO 3779 excludes I, O and Q from VINs.
fn is_vin_byte(b: u8) -> bool {
    b.is_ascii_digit() || (b.is_ascii_uppercase() && !matches!(b, b'I' | b'O' | b'Q'))
}

/// Byte offsets of every 17-character VIN token in an upper-cased string.
/// A token is a maximal alphanumeric run.
fn vin_token_starts(upper: &str) -> Vec<usize> {
    let bytes = upper.as_bytes();
    let mut starts = Vec::new();
    let mut run_start: Option<usize> = None;
    for i in 0..=bytes.len() {
        if bytes.get(i).is_some_and(u8::is_ascii_alphanumeric) {
            run_start.get_or_insert(i);
        } else if let Some(start) = run_start.take() {
            let run = &bytes[start..i];
            if run.len() == constants::VIN_LENGTH && run.iter().all(|&b| is_vin_byte(b)) {
                starts.push(start);
            }
        }
    }
    starts
}

/// True when `value` is a single 17-character VIN with at least one digit.
pub fn looks_like_vin(value: &str) -> bool {
    let v = value.trim().to_ascii_uppercase();
    v.len() == constants::VIN_LENGTH
        && v.bytes().any(|b| b.is_ascii_digit())
        && v.bytes().all(is_vin_byte)
}

/// True when `value` reads as one or more ENGINE-VIN pairs: a VIN token that
/// follows some engine text.
pub fn looks_like_composite(value: &str) -> bool {
    let upper = value.trim().to_ascii_uppercase();
    vin_token_starts(&upper).into_iter().any(|start| start > 0)
}

/// Split a composite cell into ENGINE-VIN pairs.
///
/// Pairs are comma-separated. Each pair splits at `--` when present,
/// otherwise where the last 17-character VIN token begins, otherwise at the first
/// `-`. A pair without any separator is taken as an engine number with no
/// VIN.
pub fn split_composite(cell: &str) -> Vec<EngineVin> {
    cell.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(split_pair)
        .collect()
}

fn split_pair(pair: &str) -> EngineVin {
    let (engine, vin) = if let Some((engine, vin)) = pair.split_once("--") {
        (engine, vin)
    } else if let Some(start) = vin_token_start(pair) {
        (&pair[..start], &pair[start..])
    } else if let Some((engine, vin)) = pair.split_once('-') {
        (engine, vin)
    } else {
        (pair, "")
    };

    EngineVin {
        engine: clean_engine(engine),
        vin: canonical_vin(vin),
    }
}

/// Byte offset where the last VIN token in `pair` starts.
fn vin_token_start(pair: &str) -> Option<usize> {
    // ASCII upper-casing keeps byte offsets valid for `pair`.
    vin_token_starts(&pair.to_ascii_uppercase()).last().copied()
}

/// Clean an engine number: drop asterisks and quotes, trailing dashes, and
/// spaces after hyphens; keep only word characters and hyphens.
pub fn clean_engine(raw: &str) -> Option<String> {
    static SPACE_AFTER_HYPHEN: OnceLock<Regex> = OnceLock::new();
    let re = SPACE_AFTER_HYPHEN
        .get_or_init(|| Regex::new(r"-\s+").expect("clean_engine: invalid regex"));

    let trimmed = raw.trim().trim_end_matches(['-', '*', ' ']);
    let unquoted: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '*' | '"' | '\''))
        .collect();
    let joined = re.replace_all(&unquoted, "-");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>()
        .trim_matches('-')
        .to_uppercase();

    (!cleaned.is_empty()).then_some(cleaned)
}
