use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};
use wayback_core::{Target, FAILURE_LOG_FILENAME};

use crate::encode::normalize_target;

/// Used when the target path has no usable last segment.
pub const FALLBACK_FILENAME: &str = "downloaded_file";

const MAX_FILENAME_BYTES: usize = 200;

/// Filename for a target: last path segment of the original URL, decoded.
pub fn derive_filename(target: &str) -> String {
    let segment = match normalize_target(target) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => raw_last_segment(target),
    };
    let decoded = percent_decode_str(&segment).decode_utf8_lossy();
    sanitize_filename(&decoded)
}

/// One filename per target, unique within the batch.
///
/// Later duplicates get a short hash suffix; the failure log name is treated
/// as taken.
pub fn assign_filenames(targets: &[Target]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    taken.insert(FAILURE_LOG_FILENAME.to_ascii_lowercase());

    targets
        .iter()
        .map(|target| {
            let base = derive_filename(&target.url);
            let mut candidate = base.clone();
            let mut salt = 0u32;
            while taken.contains(&candidate.to_ascii_lowercase()) {
                let key = if salt == 0 {
                    target.url.clone()
                } else {
                    format!("{}#{}#{}", target.url, target.index, salt)
                };
                candidate = disambiguate(&base, &key);
                salt += 1;
            }
            taken.insert(candidate.to_ascii_lowercase());
            candidate
        })
        .collect()
}

/// `{stem}--{short_hash(key)}{.ext}`
pub fn disambiguate(filename: &str, key: &str) -> String {
    let hash = short_hash(key);
    match split_extension(filename) {
        (stem, Some(ext)) => format!("{stem}--{hash}.{ext}"),
        (stem, None) => format!("{stem}--{hash}"),
    }
}

fn raw_last_segment(raw: &str) -> String {
    let without_query = raw.split(['?', '#']).next().unwrap_or_default();
    without_query
        .trim()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn sanitize_filename(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    if cleaned.trim().is_empty() || cleaned == "." || cleaned == ".." {
        return FALLBACK_FILENAME.to_string();
    }

    let mut name = truncate_keeping_extension(&cleaned, MAX_FILENAME_BYTES);
    let (stem, _) = split_extension(&name);
    if is_reserved_windows_name(stem) {
        name = match split_extension(&name) {
            (stem, Some(ext)) => format!("{stem}_.{ext}"),
            (stem, None) => format!("{stem}_"),
        };
    }
    name
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(pos) if pos > 0 && pos + 1 < name.len() => (&name[..pos], Some(&name[pos + 1..])),
        _ => (name, None),
    }
}

fn truncate_keeping_extension(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    let suffix = match ext {
        Some(ext) if ext.len() <= 16 => format!(".{ext}"),
        _ => String::new(),
    };
    let budget = max_bytes - suffix.len();
    let source = if suffix.is_empty() { name } else { stem };
    let mut cut = budget.min(source.len());
    while !source.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{suffix}", &source[..cut])
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}' | '\u{7F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
