use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A page record as served by the content API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub slug: String,
    #[serde(rename = "type", default)]
    pub page_type: PageType,
    /// Only present when the request asked for it to be populated
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_page_slug: Option<String>,
}

impl Page {
    pub fn new<S: Into<String>>(slug: S, content: Value) -> Self {
        Self {
            slug: slug.into(),
            page_type: PageType::Page,
            content,
            parent_page_slug: None,
        }
    }

    pub fn collection<S: Into<String>>(slug: S) -> Self {
        Self {
            page_type: PageType::Collection,
            ..Self::new(slug, Value::Null)
        }
    }

    pub fn with_parent<S: Into<String>>(mut self, parent: S) -> Self {
        self.parent_page_slug = Some(parent.into());
        self
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.page_type, PageType::Collection)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    #[default]
    Page,
    Collection,
}
