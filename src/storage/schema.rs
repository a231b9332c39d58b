//! Database schema definitions
//!
//! Every table the harvester writes is declared here, keyed by name. Column
//! sets are fixed: records written to a table must carry exactly these
//! columns.

/// A named table and its column declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns_sql: &'static str,
}

pub const CATEGORIES_TABLE: TableSchema = TableSchema {
    name: "categories",
    columns_sql: "
    id INTEGER PRIMARY KEY,
    gender TEXT,
    category TEXT,
    subcategory TEXT,
    base_url TEXT
",
};

pub const PAGES_URLS_TABLE: TableSchema = TableSchema {
    name: "pages_urls",
    columns_sql: "
    id INTEGER,
    page_url TEXT PRIMARY KEY
",
};

pub const ARTICLES_URLS_TABLE: TableSchema = TableSchema {
    name: "articles_urls",
    columns_sql: "
    id INTEGER,
    page_url TEXT,
    article_url TEXT PRIMARY KEY
",
};

pub const ARTICLES_DATA_TABLE: TableSchema = TableSchema {
    name: "articles_data",
    columns_sql: "
    id INTEGER,
    article_url TEXT PRIMARY KEY,
    description TEXT,
    colour TEXT,
    tags TEXT,
    materials TEXT,
    images_urls TEXT
",
};

/// All tables in stage order
pub const TABLES: [TableSchema; 4] = [
    CATEGORIES_TABLE,
    PAGES_URLS_TABLE,
    ARTICLES_URLS_TABLE,
    ARTICLES_DATA_TABLE,
];

/// Looks up a table schema by name
pub fn schema_for(table: &str) -> Option<&'static TableSchema> {
    TABLES.iter().find(|schema| schema.name == table)
}

/// `CREATE TABLE IF NOT EXISTS` statement for a schema
pub fn create_table_sql(schema: &TableSchema) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        schema.name, schema.columns_sql
    )
}
