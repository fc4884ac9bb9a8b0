/// Position of a target in the original input list.
pub type TargetIndex = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub index: TargetIndex,
    pub url: String,
}

impl Target {
    pub fn new(index: TargetIndex, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
        }
    }
}

/// Splits a newline-delimited list into trimmed, non-empty URL strings.
///
/// There is no comment syntax; every non-blank line is a target.
pub fn parse_targets(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Tags each URL with its input position.
pub fn index_targets(urls: Vec<String>) -> Vec<Target> {
    urls.into_iter()
        .enumerate()
        .map(|(index, url)| Target::new(index, url))
        .collect()
}
