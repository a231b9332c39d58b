//! Storefront HTML parsing
//!
//! Pure functions over page bodies, kept apart from fetching so they can be
//! tested on fixtures:
//! - category discovery from the home page navigation
//! - pagination of a category listing
//! - article links of a listing page
//! - product details of an article page

use crate::storage::Category;
use crate::utils::flatten;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::OnceLock;
use url::Url;

/// Product details scraped from an article page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDetails {
    pub description: Option<String>,
    pub colour: Option<String>,
    pub tags: Option<Vec<String>>,
    pub materials: Option<Vec<String>>,
    pub images_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct ProductConfig {
    #[serde(default)]
    name: Option<serde_json::Value>,
    #[serde(default)]
    images: Option<Vec<ProductImage>>,
}

#[derive(Debug, Deserialize)]
struct ProductImage {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    colour: Option<String>,
}

fn selector(css: &str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|e| format!("invalid selector {}: {:?}", css, e))
}

fn pagination_regex() -> &'static Regex {
    static PAGINATION: OnceLock<Regex> = OnceLock::new();
    PAGINATION.get_or_init(|| {
        Regex::new(r"You(?:'|’)ve viewed ([0-9,]+) of ([0-9,]+) products$")
            .expect("pagination pattern is valid")
    })
}

/// Extracts the clothing categories linked from the home page navigation
///
/// Category links look like `<base>/<gender>/<subcategory>/cat/?cid=<id>`.
/// Links that are promotions (`ctas`) or "new in" listings are skipped, and
/// the `#nlid=...` tracking fragment is dropped.
///
/// # Returns
///
/// * `Ok(Some(categories))` - The navigation was found
/// * `Ok(None)` - The page has no clothing navigation at all
/// * `Err(String)` - The base URL is unusable
pub fn parse_categories(html: &str, base_url: &str) -> Result<Option<Vec<Category>>, String> {
    let base = Url::parse(base_url).map_err(|e| format!("invalid base URL {}: {}", base_url, e))?;
    let pattern = Regex::new(&format!(
        r"^{}/([a-z]+)/([a-z/-]+)/cat/\?cid=([0-9]+)$",
        regex::escape(base.as_str().trim_end_matches('/'))
    ))
    .map_err(|e| e.to_string())?;

    let document = Html::parse_document(html);
    let button_selector = selector(r#"button[data-testid="primarynav-button"]"#)?;
    let link_selector = selector("ul li > a[href]")?;

    // The page holds one navigation per gender
    let nav_buttons: Vec<ElementRef> = document
        .select(&button_selector)
        .filter(|button| button.text().collect::<String>().trim() == "Clothing")
        .collect();

    if nav_buttons.is_empty() {
        return Ok(None);
    }

    let hrefs_per_nav: Vec<Vec<String>> = nav_buttons
        .iter()
        .map(|button| {
            button
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "div")
                .map(|menu| {
                    menu.select(&link_selector)
                        .filter_map(|a| a.value().attr("href"))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        })
        .collect();

    let mut categories = Vec::new();
    for href in flatten(hrefs_per_nav) {
        if !href.contains("cid=") || href.contains("ctas") || href.contains("new-in") {
            continue;
        }

        let without_fragment = href.split('#').next().unwrap_or_default();
        let Ok(absolute) = base.join(without_fragment) else {
            continue;
        };
        let absolute = absolute.to_string();

        let Some(captures) = pattern.captures(&absolute) else {
            continue;
        };
        let Ok(id) = captures[3].parse::<i64>() else {
            continue;
        };

        categories.push(Category {
            id,
            gender: captures[1].to_string(),
            category: "clothing".to_string(),
            subcategory: captures[2].to_string(),
            base_url: absolute,
        });
    }

    Ok(Some(categories))
}

/// Computes the number of listing pages of a category
///
/// The listing shows "You've viewed X of Y products" right before a
/// `<progress>` bar; the page count is `ceil(Y / X)`. Pages without that
/// counter have a single page.
pub fn parse_total_pages(html: &str) -> Result<u64, String> {
    let document = Html::parse_document(html);
    let progress_selector = selector("progress")?;

    let Some(progress) = document.select(&progress_selector).next() else {
        return Ok(1);
    };

    let counter_text = progress.prev_siblings().find_map(|node| {
        let text = match ElementRef::wrap(node) {
            Some(element) => element.text().collect::<String>(),
            None => node.value().as_text().map(|t| String::from(&**t))?,
        };
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    });

    let Some(counter_text) = counter_text else {
        return Ok(1);
    };
    let Some(captures) = pagination_regex().captures(&counter_text) else {
        return Ok(1);
    };

    let per_page = parse_count(&captures[1])?;
    let total = parse_count(&captures[2])?;
    if per_page == 0 {
        return Ok(1);
    }

    Ok(total.div_ceil(per_page))
}

fn parse_count(raw: &str) -> Result<u64, String> {
    raw.replace(',', "")
        .parse::<u64>()
        .map_err(|e| format!("invalid product count '{}': {}", raw, e))
}

/// Extracts the article links of a listing page
///
/// Each `<article>` contributes the `href` of its first link, resolved
/// against the page URL. Articles without a link are ignored.
pub fn parse_article_urls(html: &str, page_url: &str) -> Result<Vec<String>, String> {
    let base = Url::parse(page_url).map_err(|e| format!("invalid page URL {}: {}", page_url, e))?;
    let document = Html::parse_document(html);
    let article_selector = selector("article")?;
    let link_selector = selector("a[href]")?;

    let urls = document
        .select(&article_selector)
        .filter_map(|article| article.select(&link_selector).next())
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|url| url.to_string())
        .collect();

    Ok(urls)
}

/// Extracts product details from an article page
///
/// Name, colour and images come from the product config the storefront
/// embeds as `window.<site>.pdp.config.product = {...};`. Tags and materials
/// come from the description blocks of the page. Text is trimmed and
/// lower-cased.
pub fn parse_article_data(html: &str, site_name: &str) -> Result<ArticleDetails, String> {
    let mut details = ArticleDetails::default();

    let config_pattern = Regex::new(&format!(
        r"window\.{}\.pdp\.config\.product = (.*);",
        regex::escape(site_name)
    ))
    .map_err(|e| e.to_string())?;

    if let Some(captures) = config_pattern.captures(html) {
        let product: ProductConfig = serde_json::from_str(&captures[1])
            .map_err(|e| format!("invalid product config: {}", e))?;

        details.description = product
            .name
            .as_ref()
            .and_then(|name| name.as_str())
            .map(|name| name.trim().to_lowercase());

        if let Some(images) = product.images {
            details.colour = images
                .iter()
                .filter_map(|image| image.colour.as_deref())
                .find(|colour| !colour.is_empty())
                .map(|colour| colour.trim().to_lowercase());

            let urls: Vec<String> = images.into_iter().filter_map(|image| image.url).collect();
            if !urls.is_empty() {
                details.images_urls = Some(urls);
            }
        }
    }

    let document = Html::parse_document(html);

    let tag_selector = selector("div#productDescriptionDetails li")?;
    let tags: Vec<String> = document
        .select(&tag_selector)
        .map(|li| li.text().collect::<String>().trim().to_lowercase())
        .collect();
    if !tags.is_empty() {
        details.tags = Some(tags);
    }

    let about_selector = selector("div#productDescriptionAboutMe")?;
    if let Some(about) = document.select(&about_selector).next() {
        let text = about.text().collect::<Vec<_>>().join("\n");
        details.materials = Some(
            text.trim()
                .to_lowercase()
                .lines()
                .map(str::to_string)
                .collect(),
        );
    }

    Ok(details)
}
