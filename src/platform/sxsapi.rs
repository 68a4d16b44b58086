//! sxsapi.com: markdown flow text
//!
//! Both listing and detail pages are converted to markdown and scanned line
//! by line. A listing heading looks like
//! `##  [ 项目标题 ](https://sxsapi.com/</post/235>) ￥ 5千~1万`, followed by
//! bullet lines for duration and bidding deadline.

use super::PlatformDefinition;
use crate::crawler::{DetailRules, FetchMode};
use crate::discover::{Denylist, LineDiscoverer, DEFAULT_DENYLIST};
use crate::extract::{ExtractError, FieldExtractor, FieldRule, MarkupKind, Rule};
use url::Url;

pub const NAME: &str = "sxsapi";
pub const BASE_URL: &str = "https://sxsapi.com";
pub const LIST_URL: &str = "https://sxsapi.com/?pageNo={page}";

const HEADING: &str = r"##\s*\[\s*(?P<title>[^\]]+?)\s*\]\s*\((?P<url>[^)\s]*?/post/\d+[^)]*)\)\s*￥\s*(?P<price>[\d~万千以上以下待商议]+)";
const DURATION_LINE: &str = r"\*\s*(\d+天|商议工期)";
const DEADLINE_LINE: &str = r"\*\s*竞标截止：(\d{4}-\d{2}-\d{2})";

const DESCRIPTION_START: &str = "项目描述";
const DESCRIPTION_STOPS: &[&str] = &["附件", "报名列表", "阅读全部", "开发者工作指南"];

const SCROLL_SCRIPT: &str = r#"
(async () => {
  window.scrollTo(0, document.body.scrollHeight);
  await new Promise(r => setTimeout(r, 1000));
  window.scrollTo(0, 0);
})()
"#;

pub fn discoverer(base: &Url) -> Result<LineDiscoverer, ExtractError> {
    Ok(LineDiscoverer::new(HEADING, base.clone())?
        .attribute("duration", DURATION_LINE)?
        .attribute("deadline", DEADLINE_LINE)?
        .with_denylist(Denylist::from(DEFAULT_DENYLIST)))
}

/// Fields of a detail page in flow text
pub fn detail_fields() -> Result<FieldExtractor, ExtractError> {
    Ok(FieldExtractor::new(vec![
        FieldRule::text("title").rule(Rule::pattern(r"(?m)^#\s*([^#\n]+?)(?:\s*￥|$)")?),
        FieldRule::text("price").rule(Rule::pattern(r"￥\s*([\d~万千以上以下待商议]+)")?),
        FieldRule::text("duration").rule(Rule::pattern(r"工期[：要求]*：\s*(\d+天|商议工期)")?),
        FieldRule::date("deadline").rule(Rule::pattern(r"竞标截止：(\d{4}-\d{2}-\d{2})")?),
        FieldRule::text("description").rule(Rule::section(DESCRIPTION_START, DESCRIPTION_STOPS)),
        FieldRule::text("skills").rule(Rule::pattern(r"技能要求：([^\n]+)")?),
        FieldRule::text("cooperation").rule(Rule::pattern(r"合作倾向：([^\n]+)")?),
    ]))
}

pub fn definition() -> Result<PlatformDefinition, ExtractError> {
    let base = Url::parse(BASE_URL)?;

    Ok(PlatformDefinition {
        name: NAME,
        list_url: LIST_URL,
        list_mode: FetchMode::Rendered {
            wait_for: Some(".project-list, .project-grid, .job-list".to_string()),
            script: Some(SCROLL_SCRIPT.to_string()),
        },
        markup: MarkupKind::Flow,
        discoverer: Box::new(discoverer(&base)?),
        detail: DetailRules {
            mode: FetchMode::Rendered {
                wait_for: Some("main, article, .content, .container".to_string()),
                script: Some(SCROLL_SCRIPT.to_string()),
            },
            markup: MarkupKind::Flow,
            extractor: detail_fields()?,
        },
    })
}
