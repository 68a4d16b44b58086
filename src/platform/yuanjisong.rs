//! yuanjisong.com: structural HTML blocks
//!
//! Listing pages carry one styled container per job. Detail pages hold a
//! label/value table of basic info plus an employer credit panel.

use super::PlatformDefinition;
use crate::crawler::{DetailRules, FetchMode};
use crate::discover::{BlockDiscoverer, Denylist, DEFAULT_DENYLIST};
use crate::extract::{ExtractError, FieldExtractor, FieldRule, MarkupKind, Missing, Rule};
use url::Url;

pub const NAME: &str = "yuanjisong";
pub const BASE_URL: &str = "https://www.yuanjisong.com";
pub const LIST_URL: &str = "https://www.yuanjisong.com/job/allcity/page{page}";

const CONTAINER: &str = "div.div_bg_color_fff.div_padding_1.hover1.margin_bottom_1";

const LIST_SCRIPT: &str = r#"
(async () => {
  window.scrollTo(0, document.body.scrollHeight);
  await new Promise(r => setTimeout(r, 2000));
  window.scrollTo(0, 0);
})()
"#;

const DETAIL_SCRIPT: &str = r#"
(async () => {
  window.scrollTo(0, document.body.scrollHeight);
  await new Promise(r => setTimeout(r, 1000));
  window.scrollTo(0, 0);
  await new Promise(r => setTimeout(r, 500));
})()
"#;

const INFO_ROW: &str = ".basic_info_row";
const INFO_LABEL: &str = ".font_color_3";
const INFO_VALUE: &str = "li:last-child";

/// Block-scoped fields of one listing container
pub fn listing_fields(base: &Url) -> Result<FieldExtractor, ExtractError> {
    Ok(FieldExtractor::new(vec![
        FieldRule::text("title")
            .rule(Rule::css("a[href*='/job/'] b")?)
            .rule(Rule::css("a[href*='/job/']")?),
        FieldRule::link("url").rule(Rule::css_attr("a[href*='/job/']", "href")?),
        FieldRule::text("description")
            .rule(Rule::pattern(r"描述：\s*([^\n]+)")?)
            .rule(Rule::css("p.margin_bottom_10")?)
            .strip("描述："),
        FieldRule::text("duration").rule(Rule::pattern(r"工时：\s*([^\n]+)")?),
        FieldRule::integer("price", Missing::Zero).rule(Rule::css("span.rixin-text-jobs")?),
        FieldRule::integer("applicants", Missing::Zero).rule(Rule::css("i.i_post_num")?),
        FieldRule::link("employer_url").rule(Rule::css_attr("a[href*='/employer/']", "href")?),
        FieldRule::text("employer_name").rule(Rule::css("a[href*='/employer/'] span")?),
    ])
    .with_base_url(base.clone()))
}

/// Page-scoped fields of a detail page
pub fn detail_fields(base: &Url) -> Result<FieldExtractor, ExtractError> {
    let info = |label: &str| Rule::labeled(INFO_ROW, INFO_LABEL, INFO_VALUE, label);
    let credit = |nth: u32| {
        Rule::css(&format!(
            ".admin-content-list li:nth-of-type({}) span a",
            nth
        ))
    };

    Ok(FieldExtractor::new(vec![
        FieldRule::text("title")
            .rule(Rule::css("h2")?)
            .rule(Rule::css(".consultant_title")?),
        FieldRule::text("cooperation_type").rule(info("合作方式")?),
        FieldRule::integer("daily_salary", Missing::Omit).rule(info("预估日薪")?),
        FieldRule::integer("total_price", Missing::Omit).rule(info("预估总价")?),
        FieldRule::integer("duration", Missing::Omit).rule(info("预估工时")?),
        FieldRule::text("location").rule(info("所在区域")?),
        FieldRule::text("description").rule(Rule::css(".mobmid p")?),
        FieldRule::integer("employer_projects", Missing::Zero).rule(credit(1)?),
        FieldRule::integer("employer_reviews", Missing::Zero).rule(credit(2)?),
        FieldRule::integer("employer_complaints", Missing::Zero).rule(credit(3)?),
    ])
    .with_base_url(base.clone()))
}

pub fn definition() -> Result<PlatformDefinition, ExtractError> {
    let base = Url::parse(BASE_URL)?;

    let discoverer = BlockDiscoverer::new(CONTAINER, listing_fields(&base)?)?
        .with_denylist(Denylist::from(DEFAULT_DENYLIST));

    Ok(PlatformDefinition {
        name: NAME,
        list_url: LIST_URL,
        list_mode: FetchMode::Rendered {
            wait_for: Some(".div_bg_color_fff".to_string()),
            script: Some(LIST_SCRIPT.to_string()),
        },
        markup: MarkupKind::Html,
        discoverer: Box::new(discoverer),
        detail: DetailRules {
            mode: FetchMode::Rendered {
                wait_for: Some("h2".to_string()),
                script: Some(DETAIL_SCRIPT.to_string()),
            },
            markup: MarkupKind::Html,
            extractor: detail_fields(&base)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::Discoverer;
    use crate::extract::Markup;
    use serde_json::json;

    const LIST_PAGE: &str = r#"
<html><body>
<div class="div_bg_color_fff div_padding_1 hover1 margin_bottom_1">
  <a href="/job/12345"><h4><b>微信小程序开发</b></h4></a>
  <p class="margin_bottom_10">描述：需要开发一个点餐小程序</p>
  <p><span class="glyphicon glyphicon-time"></span>工时：5天</p>
  <span class="rixin-text-jobs">800</span>
  <i class="i_post_num">12</i>
  <a href="/employer/678"><span>某科技公司</span></a>
</div>
<div class="div_bg_color_fff div_padding_1 hover1 margin_bottom_1">
  <a href="/job/12346"><h4><b>爬虫脚本</b></h4></a>
  <span class="rixin-text-jobs">面议</span>
</div>
<div class="div_bg_color_fff div_padding_1 hover1 margin_bottom_1">
  <p>广告位</p>
</div>
</body></html>
"#;

    const DETAIL_PAGE: &str = r#"
<html><body>
<h2>微信小程序开发</h2>
<ul class="basic_info_row"><li class="font_color_3">合作方式：</li><li>远程</li></ul>
<ul class="basic_info_row"><li class="font_color_3">预估日薪：</li><li>800元/天</li></ul>
<ul class="basic_info_row"><li class="font_color_3">预估工时：</li><li>5天</li></ul>
<ul class="basic_info_row"><li class="font_color_3">所在区域：</li><li>北京</li></ul>
<div class="mobmid"><p>需要开发一个点餐小程序，支持在线支付。</p></div>
<ul class="admin-content-list">
  <li><span><a>7</a></span></li>
  <li><span><a>3</a></span></li>
  <li><span><a>0</a></span></li>
</ul>
</body></html>
"#;

    #[test]
    fn test_list_page_blocks() {
        let definition = definition().unwrap();
        let listings = definition
            .discoverer
            .discover(&Markup::Html(LIST_PAGE.to_string()));

        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.title(), Some("微信小程序开发"));
        assert_eq!(first.url(), Some("https://www.yuanjisong.com/job/12345"));
        assert_eq!(first.get("description"), Some(&json!("需要开发一个点餐小程序")));
        assert_eq!(first.get("duration"), Some(&json!("5天")));
        assert_eq!(first.get("price"), Some(&json!(800)));
        assert_eq!(first.get("applicants"), Some(&json!(12)));
        assert_eq!(
            first.get("employer_url"),
            Some(&json!("https://www.yuanjisong.com/employer/678"))
        );
        assert_eq!(first.get("employer_name"), Some(&json!("某科技公司")));

        // Unparsable price defaults to zero
        assert_eq!(listings[1].get("price"), Some(&json!(0)));
        assert!(listings[1].get("applicants").is_none());
    }

    #[test]
    fn test_detail_page_fields() {
        let definition = definition().unwrap();
        let details = definition
            .detail
            .extractor
            .extract(&Markup::Html(DETAIL_PAGE.to_string()));

        assert_eq!(details.get("title"), Some(&json!("微信小程序开发")));
        assert_eq!(details.get("cooperation_type"), Some(&json!("远程")));
        assert_eq!(details.get("daily_salary"), Some(&json!(800)));
        assert_eq!(details.get("duration"), Some(&json!(5)));
        assert_eq!(details.get("location"), Some(&json!("北京")));
        assert!(!details.contains_key("total_price"));
        assert_eq!(
            details.get("description"),
            Some(&json!("需要开发一个点餐小程序，支持在线支付。"))
        );
        assert_eq!(details.get("employer_projects"), Some(&json!(7)));
        assert_eq!(details.get("employer_reviews"), Some(&json!(3)));
        assert_eq!(details.get("employer_complaints"), Some(&json!(0)));
    }
}
