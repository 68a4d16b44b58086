use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during canonicalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "spm", "from"];

/// Schemes that never point at a listing
const REJECTED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Canonicalizes a scraped link into an absolute listing URL
///
/// # Canonicalization Steps
///
/// 1. Keep only the first whitespace-separated token
/// 2. Strip markup artifacts (`</`, `<`, `>`) left over from markdown conversion
/// 3. Reject `javascript:`, `mailto:`, `tel:` and `data:` links
/// 4. Resolve relative links against the platform base URL
/// 5. Require an HTTP(S) scheme and a host
/// 6. Remove the fragment and tracking query parameters
///
/// # Examples
///
/// ```
/// use job_trawl::url::canonicalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://sxsapi.com").unwrap();
/// let url = canonicalize_url("https://sxsapi.com/</post/235>", &base).unwrap();
/// assert_eq!(url.as_str(), "https://sxsapi.com/post/235");
/// ```
pub fn canonicalize_url(raw: &str, base: &Url) -> Result<Url, UrlError> {
    let token = raw.split_whitespace().next().unwrap_or("");
    let cleaned = token.replace("</", "").replace(['<', '>'], "");

    if cleaned.is_empty() {
        return Err(UrlError::Rejected("empty link".to_string()));
    }

    let lowered = cleaned.to_ascii_lowercase();
    if REJECTED_SCHEMES.iter().any(|s| lowered.starts_with(s)) {
        return Err(UrlError::Rejected(cleaned));
    }

    let mut url = base
        .join(&cleaned)
        .map_err(|e| UrlError::Parse(format!("{}: {}", cleaned, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok(url)
}

/// Expands a listing-page URL template for the given page number
///
/// Every `{page}` placeholder is replaced with the 1-based page number.
pub fn page_url(template: &str, page: u32) -> String {
    template.replace("{page}", &page.to_string())
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.yuanjisong.com").unwrap()
    }

    #[test]
    fn test_relative_link_resolved() {
        let result = canonicalize_url("/job/157239", &base()).unwrap();
        assert_eq!(result.as_str(), "https://www.yuanjisong.com/job/157239");
    }

    #[test]
    fn test_absolute_link_kept() {
        let result = canonicalize_url("https://sxsapi.com/post/235", &base()).unwrap();
        assert_eq!(result.as_str(), "https://sxsapi.com/post/235");
    }

    #[test]
    fn test_markdown_artifacts_removed() {
        let result = canonicalize_url("https://sxsapi.com/</post/235> \"title\"", &base()).unwrap();
        assert_eq!(result.as_str(), "https://sxsapi.com/post/235");
    }

    #[test]
    fn test_javascript_rejected() {
        let result = canonicalize_url("javascript:void(0)", &base());
        assert!(matches!(result.unwrap_err(), UrlError::Rejected(_)));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(canonicalize_url("   ", &base()).is_err());
    }

    #[test]
    fn test_fragment_removed() {
        let result = canonicalize_url("/job/1#apply", &base()).unwrap();
        assert_eq!(result.as_str(), "https://www.yuanjisong.com/job/1");
    }

    #[test]
    fn test_tracking_params_removed() {
        let result = canonicalize_url("/job/1?utm_source=x&id=3&fbclid=y", &base()).unwrap();
        assert_eq!(result.as_str(), "https://www.yuanjisong.com/job/1?id=3");

        let result = canonicalize_url("/job/1?utm_medium=email", &base()).unwrap();
        assert_eq!(result.as_str(), "https://www.yuanjisong.com/job/1");
    }

    #[test]
    fn test_invalid_scheme() {
        let result = canonicalize_url("ftp://example.com/job/1", &base());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            page_url("https://www.yuanjisong.com/job/allcity/page{page}", 3),
            "https://www.yuanjisong.com/job/allcity/page3"
        );
        assert_eq!(
            page_url("https://sxsapi.com/?pageNo={page}", 1),
            "https://sxsapi.com/?pageNo=1"
        );
    }
}
