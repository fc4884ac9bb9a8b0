use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;
use wayback_core::FailureReason;

use crate::FetchError;

/// Everything except unreserved characters and the `/` and `:` separators.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b':')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Parses a target and normalizes its path encoding.
///
/// The path is percent-decoded and then re-encoded, so `a%20b` and `a b`
/// both end up as `a%20b` and nothing is encoded twice.
pub fn normalize_target(raw: &str) -> Result<Url, FetchError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|err| FetchError::new(FailureReason::InvalidUrl, format!("{raw}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(FetchError::new(
            FailureReason::InvalidUrl,
            format!("{raw}: not an http(s) url"),
        ));
    }

    let decoded = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();
    let encoded = utf8_percent_encode(&decoded, PATH_ENCODE_SET).to_string();
    url.set_path(&encoded);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(raw: &str) -> String {
        normalize_target(raw).unwrap().to_string()
    }

    #[test]
    fn plain_url_is_unchanged() {
        assert_eq!(
            normalized("https://example.com/a/b/report.pdf"),
            "https://example.com/a/b/report.pdf"
        );
    }

    #[test]
    fn encoded_and_raw_spaces_converge() {
        assert_eq!(
            normalized("https://example.com/my%20file.pdf"),
            normalized("https://example.com/my file.pdf")
        );
        assert_eq!(
            normalized("https://example.com/my file.pdf"),
            "https://example.com/my%20file.pdf"
        );
    }

    #[test]
    fn existing_escapes_are_not_double_encoded() {
        assert_eq!(
            normalized("https://example.com/caf%C3%A9/%28draft%29.txt"),
            "https://example.com/caf%C3%A9/%28draft%29.txt"
        );
    }

    #[test]
    fn separators_stay_unescaped() {
        assert_eq!(
            normalized("https://example.com/a:b/c(1).txt"),
            "https://example.com/a:b/c%281%29.txt"
        );
    }

    #[test]
    fn query_and_whitespace_are_kept_and_trimmed() {
        assert_eq!(
            normalized("  https://example.com/get?id=7&x=y \n"),
            "https://example.com/get?id=7&x=y"
        );
    }

    #[test]
    fn rejects_relative_and_non_http() {
        assert_eq!(
            normalize_target("not a url").unwrap_err().kind,
            FailureReason::InvalidUrl
        );
        assert_eq!(
            normalize_target("mailto:someone@example.com").unwrap_err().kind,
            FailureReason::InvalidUrl
        );
        assert_eq!(
            normalize_target("ftp://example.com/file").unwrap_err().kind,
            FailureReason::InvalidUrl
        );
    }
}
