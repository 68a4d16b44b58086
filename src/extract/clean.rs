//! Text cleanup applied to every matched value

use regex::Regex;

/// Labels stripped from the front of matched values
pub const DEFAULT_PREFIXES: &[&str] = &[
    "描述：",
    "描述:",
    "项目描述：",
    "工时：",
    "Description:",
    "Price:",
    "￥",
    "¥",
];

/// Whole-value boilerplate that is never a real field value
pub const DEFAULT_NOISE: &[&str] = &[
    r"(?i)^(登录|注册|登录\s*/\s*注册|会员中心|友链合作)$",
    r"(?i)^(log\s*in|sign\s*in|sign\s*up|register|menu|home)$",
];

/// Collapses every run of whitespace into a single space and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes raw matched text into a field value
#[derive(Debug, Clone)]
pub struct TextCleaner {
    prefixes: Vec<String>,
    noise: Vec<Regex>,
}

impl TextCleaner {
    pub fn new(prefixes: Vec<String>, noise: Vec<Regex>) -> Self {
        Self { prefixes, noise }
    }

    /// Cleans a raw value, returning `None` when nothing meaningful is left
    ///
    /// `extra_prefixes` are field-specific labels stripped in addition to the
    /// cleaner's own list.
    pub fn clean(&self, raw: &str, extra_prefixes: &[String]) -> Option<String> {
        let mut value = collapse_whitespace(raw);

        // Labels can be stacked ("描述： ￥ ..."), so strip until stable
        loop {
            let before = value.len();
            for prefix in self.prefixes.iter().chain(extra_prefixes) {
                if let Some(rest) = value.strip_prefix(prefix.as_str()) {
                    value = rest.trim_start().to_string();
                }
            }
            if value.len() == before {
                break;
            }
        }

        if value.is_empty() || self.is_noise(&value) {
            None
        } else {
            Some(value)
        }
    }

    pub fn is_noise(&self, value: &str) -> bool {
        self.noise.iter().any(|re| re.is_match(value))
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        let noise = DEFAULT_NOISE
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        Self {
            prefixes: DEFAULT_PREFIXES.iter().map(|s| s.to_string()).collect(),
            noise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b   c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_strips_known_prefixes() {
        let cleaner = TextCleaner::default();
        assert_eq!(
            cleaner.clean("描述：  需要一个小程序", &[]),
            Some("需要一个小程序".to_string())
        );
        assert_eq!(cleaner.clean("￥ 5千~1万", &[]), Some("5千~1万".to_string()));
    }

    #[test]
    fn test_strips_field_prefixes() {
        let cleaner = TextCleaner::default();
        let extra = vec!["Budget:".to_string()];
        assert_eq!(
            cleaner.clean("Budget: 300", &extra),
            Some("300".to_string())
        );
    }

    #[test]
    fn test_noise_discarded() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean(" 登录 ", &[]), None);
        assert_eq!(cleaner.clean("Sign In", &[]), None);
        assert_eq!(
            cleaner.clean("需要用户注册功能", &[]),
            Some("需要用户注册功能".to_string())
        );
    }

    #[test]
    fn test_empty_after_cleanup() {
        let cleaner = TextCleaner::default();
        assert_eq!(cleaner.clean("描述：", &[]), None);
        assert_eq!(cleaner.clean("", &[]), None);
    }
}
