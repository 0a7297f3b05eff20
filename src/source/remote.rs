use crate::error::StoreError;
use crate::metadata::ProductRecord;
use crate::source::ProductSource;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

/// Reads products from the product service's REST API.
///
/// `GET {base_url}` lists the catalog and `GET {base_url}/{id}` returns one
/// product. Products that do not answer 200 are skipped.
pub struct RemoteServiceFetcher {
    client: Client,
    base_url: String,
}

impl RemoteServiceFetcher {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base_url}/{id}` with the id encoded as a single path segment.
    fn product_url(&self, id: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| StoreError::Source(format!("Invalid product service URL '{}': {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Source(format!("Product service URL '{}' cannot take a path", self.base_url)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    async fn get_json(&self, url: &str) -> Result<Option<Value>, StoreError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::Source(format!("Product service error: {e}")))?;

        if resp.status() != StatusCode::OK {
            tracing::warn!("Product service returned {} for {}", resp.status(), url);
            return Ok(None);
        }

        let body = resp
            .json()
            .await
            .map_err(|e| StoreError::Source(format!("Parse error: {e}")))?;
        Ok(Some(body))
    }
}

#[async_trait::async_trait]
impl ProductSource for RemoteServiceFetcher {
    async fn get_products(&self, ids: Option<&[String]>) -> Result<Vec<ProductRecord>, StoreError> {
        match ids.filter(|ids| !ids.is_empty()) {
            Some(ids) => {
                let mut products = Vec::with_capacity(ids.len());
                for id in ids {
                    let url = self.product_url(id)?;
                    if let Some(body) = self.get_json(url.as_str()).await? {
                        products.push(normalize_product(&body));
                    }
                }
                Ok(products)
            }
            None => match self.get_json(&self.base_url).await? {
                Some(Value::Array(items)) => Ok(items.iter().map(normalize_product).collect()),
                Some(_) => Err(StoreError::Source(
                    "Product service listing is not a JSON array".to_string(),
                )),
                None => Ok(Vec::new()),
            },
        }
    }

    fn name(&self) -> &str {
        "product-service"
    }
}

/// Maps the product service's JSON shape onto a [`ProductRecord`].
///
/// `category` arrives either as a nested object with `name` and `description`
/// or as a plain name; only the object form carries a category description.
pub fn normalize_product(product: &Value) -> ProductRecord {
    let id = match product.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let text = |key: &str| {
        product
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let (category, category_description) = match product.get("category") {
        Some(Value::Object(obj)) => (
            obj.get("name").and_then(Value::as_str).map(str::to_string),
            obj.get("description").and_then(Value::as_str).map(str::to_string),
        ),
        Some(Value::String(name)) => (Some(name.clone()), None),
        _ => (None, None),
    };

    let stock = product
        .get("availableQuantity")
        .and_then(Value::as_f64)
        .map(|q| q.max(0.0) as u32)
        .unwrap_or(0);

    ProductRecord {
        id,
        name: text("name"),
        description: text("description"),
        price: product.get("price").and_then(Value::as_f64).unwrap_or(0.0),
        category,
        category_description,
        stock: Some(stock),
    }
}

#[cfg(test)]
mod remote_test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_url_encodes_id() {
        let fetcher = RemoteServiceFetcher::new("http://catalog:8080/api/products/".to_string());

        let url = fetcher.product_url("42").unwrap();
        assert_eq!(url.as_str(), "http://catalog:8080/api/products/42");

        let url = fetcher.product_url("a/b?c#d").unwrap();
        assert_eq!(url.as_str(), "http://catalog:8080/api/products/a%2Fb%3Fc%23d");
    }

    #[test]
    fn test_product_url_rejects_bad_base() {
        let fetcher = RemoteServiceFetcher::new("not a url".to_string());
        assert!(matches!(fetcher.product_url("1"), Err(StoreError::Source(_))));
    }

    #[test]
    fn test_normalize_nested_category() {
        let p = normalize_product(&json!({
            "id": 12,
            "name": "Drill",
            "description": "Cordless drill",
            "price": 89.5,
            "availableQuantity": 7,
            "category": {"id": 3, "name": "Tools", "description": "Power tools"}
        }));

        assert_eq!(p.id, "12");
        assert_eq!(p.name, "Drill");
        assert_eq!(p.price, 89.5);
        assert_eq!(p.stock, Some(7));
        assert_eq!(p.category.as_deref(), Some("Tools"));
        assert_eq!(p.category_description.as_deref(), Some("Power tools"));
    }

    #[test]
    fn test_normalize_string_category() {
        let p = normalize_product(&json!({
            "id": "sku-9",
            "name": "Mug",
            "description": "Ceramic mug",
            "price": 4,
            "category": "Kitchen"
        }));

        assert_eq!(p.id, "sku-9");
        assert_eq!(p.price, 4.0);
        assert_eq!(p.category.as_deref(), Some("Kitchen"));
        assert!(p.category_description.is_none());
        assert_eq!(p.stock, Some(0));
    }

    #[test]
    fn test_normalize_missing_fields() {
        let p = normalize_product(&json!({}));

        assert_eq!(p.id, "");
        assert_eq!(p.name, "");
        assert_eq!(p.description, "");
        assert_eq!(p.price, 0.0);
        assert!(p.category.is_none());
    }
}
