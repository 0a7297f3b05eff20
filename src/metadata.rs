//! Product records and the metadata store that keeps them aligned with the
//! flat index.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};

/// One catalog product as it is embedded and returned from search.
///
/// `id` is not required to be unique; the store never deduplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub category_description: Option<String>,
    #[serde(default)]
    pub stock: Option<u32>,
}

impl ProductRecord {
    /// Builds the text that gets embedded for this product.
    ///
    /// A missing category reads as `N/A` here while staying `None` on the
    /// record itself. The category info segment is only present when the
    /// category description is.
    ///
    /// # Examples
    ///
    /// ```
    /// use prodrag::ProductRecord;
    ///
    /// let product = ProductRecord {
    ///     id: "1".to_string(),
    ///     name: "Widget".to_string(),
    ///     description: "A widget".to_string(),
    ///     price: 9.99,
    ///     category: Some("Tools".to_string()),
    ///     category_description: None,
    ///     stock: None,
    /// };
    /// assert_eq!(
    ///     product.searchable_text(),
    ///     "Product: Widget | Description: A widget | Category: Tools | Price: $9.99"
    /// );
    /// ```
    pub fn searchable_text(&self) -> String {
        let mut parts = vec![
            format!("Product: {}", self.name),
            format!("Description: {}", self.description),
            format!("Category: {}", self.category.as_deref().unwrap_or("N/A")),
            format!("Price: ${:?}", self.price),
        ];

        if let Some(info) = self.category_description.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("Category Info: {}", info));
        }

        parts.join(" | ")
    }
}

/// Product records in flat-index insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataStore {
    records: Vec<ProductRecord>,
}

impl MetadataStore {
    pub fn new() -> MetadataStore {
        MetadataStore { records: Vec::new() }
    }

    pub fn append(&mut self, records: &[ProductRecord]) {
        self.records.extend_from_slice(records);
    }

    pub fn get(&self, position: usize) -> Result<&ProductRecord, StoreError> {
        self.records.get(position).ok_or(StoreError::OutOfRange {
            position,
            count: self.records.len(),
        })
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }
}
