//! Typed rows, one per stage table

use crate::storage::schema::{
    ARTICLES_DATA_TABLE, ARTICLES_URLS_TABLE, CATEGORIES_TABLE, PAGES_URLS_TABLE,
};
use crate::storage::{
    integer_field, optional_text_field, text_field, FieldValue, Record, Row, StorageResult,
};

/// A product category and the URL of its first listing page
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    pub id: i64,
    pub gender: String,
    pub category: String,
    pub subcategory: String,
    pub base_url: String,
}

/// One listing page of a category
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageUrl {
    /// Category id
    pub id: i64,
    pub page_url: String,
}

/// An article link found on a listing page
///
/// `article_url` is `None` for listing pages without any article, so that
/// every visited page leaves a trace in the table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleUrl {
    pub id: i64,
    pub page_url: String,
    pub article_url: Option<String>,
}

/// Product details scraped from an article page
///
/// List-valued fields are stored as JSON arrays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleData {
    pub id: i64,
    pub article_url: String,
    pub description: Option<String>,
    pub colour: Option<String>,
    pub tags: Option<String>,
    pub materials: Option<String>,
    pub images_urls: Option<String>,
}

fn record<const N: usize>(fields: [(&str, FieldValue); N]) -> Record {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

impl Row for Category {
    const TABLE: &'static str = CATEGORIES_TABLE.name;

    fn to_record(&self) -> Record {
        record([
            ("id", self.id.into()),
            ("gender", self.gender.as_str().into()),
            ("category", self.category.as_str().into()),
            ("subcategory", self.subcategory.as_str().into()),
            ("base_url", self.base_url.as_str().into()),
        ])
    }

    fn from_record(record: &Record) -> StorageResult<Self> {
        Ok(Self {
            id: integer_field(record, Self::TABLE, "id")?,
            gender: text_field(record, Self::TABLE, "gender")?,
            category: text_field(record, Self::TABLE, "category")?,
            subcategory: text_field(record, Self::TABLE, "subcategory")?,
            base_url: text_field(record, Self::TABLE, "base_url")?,
        })
    }
}

impl Row for PageUrl {
    const TABLE: &'static str = PAGES_URLS_TABLE.name;

    fn to_record(&self) -> Record {
        record([
            ("id", self.id.into()),
            ("page_url", self.page_url.as_str().into()),
        ])
    }

    fn from_record(record: &Record) -> StorageResult<Self> {
        Ok(Self {
            id: integer_field(record, Self::TABLE, "id")?,
            page_url: text_field(record, Self::TABLE, "page_url")?,
        })
    }
}

impl Row for ArticleUrl {
    const TABLE: &'static str = ARTICLES_URLS_TABLE.name;

    fn to_record(&self) -> Record {
        record([
            ("id", self.id.into()),
            ("page_url", self.page_url.as_str().into()),
            ("article_url", self.article_url.clone().into()),
        ])
    }

    fn from_record(record: &Record) -> StorageResult<Self> {
        Ok(Self {
            id: integer_field(record, Self::TABLE, "id")?,
            page_url: text_field(record, Self::TABLE, "page_url")?,
            article_url: optional_text_field(record, Self::TABLE, "article_url")?,
        })
    }
}

impl Row for ArticleData {
    const TABLE: &'static str = ARTICLES_DATA_TABLE.name;

    fn to_record(&self) -> Record {
        record([
            ("id", self.id.into()),
            ("article_url", self.article_url.as_str().into()),
            ("description", self.description.clone().into()),
            ("colour", self.colour.clone().into()),
            ("tags", self.tags.clone().into()),
            ("materials", self.materials.clone().into()),
            ("images_urls", self.images_urls.clone().into()),
        ])
    }

    fn from_record(record: &Record) -> StorageResult<Self> {
        Ok(Self {
            id: integer_field(record, Self::TABLE, "id")?,
            article_url: text_field(record, Self::TABLE, "article_url")?,
            description: optional_text_field(record, Self::TABLE, "description")?,
            colour: optional_text_field(record, Self::TABLE, "colour")?,
            tags: optional_text_field(record, Self::TABLE, "tags")?,
            materials: optional_text_field(record, Self::TABLE, "materials")?,
            images_urls: optional_text_field(record, Self::TABLE, "images_urls")?,
        })
    }
}
