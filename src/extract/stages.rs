//! One extractor per harvest stage

use crate::config::CategoryEntry;
use crate::extract::parser::{
    parse_article_data, parse_article_urls, parse_categories, parse_total_pages,
};
use crate::extract::{ExtractError, Extractor, Session};
use crate::storage::{ArticleData, ArticleUrl, Category, PageUrl};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Work item of the first stage: the storefront home page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SiteRoot {
    pub url: String,
}

/// Discovers categories from the home page navigation
///
/// Hand-maintained categories are merged over the discovered ones (same id
/// wins), and used alone when the navigation cannot be found.
#[derive(Debug, Clone, Default)]
pub struct CategoryExtractor {
    extra: Vec<Category>,
}

impl CategoryExtractor {
    pub fn new(extra: Vec<Category>) -> Self {
        Self { extra }
    }

    /// Builds the extractor from `[[extra-category]]` entries
    pub fn from_entries(entries: &[CategoryEntry]) -> Self {
        Self::new(entries.iter().map(Category::from).collect())
    }
}

impl From<&CategoryEntry> for Category {
    fn from(entry: &CategoryEntry) -> Self {
        Category {
            id: entry.id,
            gender: entry.gender.clone(),
            category: entry.category.clone(),
            subcategory: entry.subcategory.clone(),
            base_url: entry.base_url.clone(),
        }
    }
}

#[async_trait]
impl Extractor for CategoryExtractor {
    type Item = SiteRoot;
    type Output = Category;

    fn name(&self) -> &'static str {
        "categories"
    }

    async fn extract(
        &self,
        session: &Session,
        item: &SiteRoot,
    ) -> Result<Vec<Category>, ExtractError> {
        let html = session.get_text(&item.url).await?;
        let discovered = parse_categories(&html, &session.site().base_url).map_err(|message| {
            ExtractError::Parse {
                url: item.url.clone(),
                message,
            }
        })?;

        let mut by_id: BTreeMap<i64, Category> = BTreeMap::new();
        match discovered {
            Some(categories) => {
                tracing::debug!("Discovered {} categories on {}", categories.len(), item.url);
                by_id.extend(categories.into_iter().map(|c| (c.id, c)));
            }
            None => {
                tracing::warn!(
                    "No clothing navigation on {}, using {} configured categories",
                    item.url,
                    self.extra.len()
                );
            }
        }
        by_id.extend(self.extra.iter().cloned().map(|c| (c.id, c)));

        Ok(by_id.into_values().collect())
    }
}

/// Expands a category into the URLs of all its listing pages
#[derive(Debug, Clone, Copy, Default)]
pub struct PageUrlExtractor;

#[async_trait]
impl Extractor for PageUrlExtractor {
    type Item = Category;
    type Output = PageUrl;

    fn name(&self) -> &'static str {
        "pages urls"
    }

    async fn extract(
        &self,
        session: &Session,
        category: &Category,
    ) -> Result<Vec<PageUrl>, ExtractError> {
        let html = session.get_text(&category.base_url).await?;
        let total_pages = parse_total_pages(&html).map_err(|message| ExtractError::Parse {
            url: category.base_url.clone(),
            message,
        })?;

        Ok((1..=total_pages)
            .map(|page| PageUrl {
                id: category.id,
                page_url: format!("{}&page={}", category.base_url, page),
            })
            .collect())
    }
}

/// Lists the article links of one listing page
///
/// A page without articles yields a single row with no article URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleUrlExtractor;

#[async_trait]
impl Extractor for ArticleUrlExtractor {
    type Item = PageUrl;
    type Output = ArticleUrl;

    fn name(&self) -> &'static str {
        "articles urls"
    }

    async fn extract(
        &self,
        session: &Session,
        page: &PageUrl,
    ) -> Result<Vec<ArticleUrl>, ExtractError> {
        let html = session.get_text(&page.page_url).await?;
        let urls = parse_article_urls(&html, &page.page_url).map_err(|message| {
            ExtractError::Parse {
                url: page.page_url.clone(),
                message,
            }
        })?;

        if urls.is_empty() {
            return Ok(vec![ArticleUrl {
                id: page.id,
                page_url: page.page_url.clone(),
                article_url: None,
            }]);
        }

        Ok(urls
            .into_iter()
            .map(|url| ArticleUrl {
                id: page.id,
                page_url: page.page_url.clone(),
                article_url: Some(url),
            })
            .collect())
    }
}

/// Scrapes the product details of one article
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleDataExtractor;

#[async_trait]
impl Extractor for ArticleDataExtractor {
    type Item = ArticleUrl;
    type Output = ArticleData;

    fn name(&self) -> &'static str {
        "articles data"
    }

    async fn extract(
        &self,
        session: &Session,
        article: &ArticleUrl,
    ) -> Result<Vec<ArticleData>, ExtractError> {
        let url = article.article_url.as_deref().ok_or_else(|| {
            ExtractError::Contract(format!(
                "article row for {} has no article URL",
                article.page_url
            ))
        })?;

        let html = session.get_text(url).await?;
        let details =
            parse_article_data(&html, &session.site().name).map_err(|message| {
                ExtractError::Parse {
                    url: url.to_string(),
                    message,
                }
            })?;

        Ok(vec![ArticleData {
            id: article.id,
            article_url: url.to_string(),
            description: details.description,
            colour: details.colour,
            tags: to_json(details.tags),
            materials: to_json(details.materials),
            images_urls: to_json(details.images_urls),
        }])
    }
}

fn to_json(values: Option<Vec<String>>) -> Option<String> {
    values.and_then(|values| serde_json::to_string(&values).ok())
}
