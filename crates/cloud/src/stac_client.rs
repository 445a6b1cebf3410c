//! Async STAC client for searching spatio-temporal asset catalogs.
//!
//! Supports Planetary Computer and Earth Search out of the box, plus
//! arbitrary STAC API endpoints via [`StacCatalog::Custom`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CloudError, Result};
use crate::http::HttpClient;
use crate::retry::RetryPolicy;
use crate::stac_models::{StacItem, StacItemCollection, StacLink, StacSearchParams};

const PC_SIGN_URL: &str = "https://planetarycomputer.microsoft.com/api/sas/v1/sign";

// ---------------------------------------------------------------------------
// Catalog enum
// ---------------------------------------------------------------------------

/// Well-known STAC catalogs plus custom endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StacCatalog {
    /// Microsoft Planetary Computer STAC API.
    PlanetaryComputer,
    /// AWS Earth Search (Element 84).
    EarthSearch,
    /// Any STAC API root, e.g. `"https://my-stac.example.com/api/v1"`.
    Custom(String),
}

impl StacCatalog {
    /// Full `/search` URL for this catalog.
    pub fn search_url(&self) -> String {
        match self {
            Self::PlanetaryComputer => {
                "https://planetarycomputer.microsoft.com/api/stac/v1/search".to_string()
            }
            Self::EarthSearch => "https://earth-search.aws.element84.com/v1/search".to_string(),
            Self::Custom(base) => {
                let base = base.trim_end_matches('/');
                if base.ends_with("/search") {
                    base.to_string()
                } else {
                    format!("{}/search", base)
                }
            }
        }
    }

    /// Parse a shorthand (`pc`, `es`, ...) or treat the string as a URL.
    pub fn from_str_or_url(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pc" | "planetary-computer" | "planetarycomputer" => Self::PlanetaryComputer,
            "es" | "earth-search" | "earthsearch" => Self::EarthSearch,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Whether asset hrefs need SAS signing before download.
    pub fn needs_signing(&self) -> bool {
        matches!(self, Self::PlanetaryComputer)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Async client for STAC Item Search.
#[derive(Debug, Clone)]
pub struct StacClient {
    catalog: StacCatalog,
    http: HttpClient,
    max_items: usize,
}

impl StacClient {
    /// `max_items` caps the total across all pages of one search.
    pub fn new(catalog: StacCatalog, retry: RetryPolicy, max_items: usize) -> Result<Self> {
        Ok(Self {
            catalog,
            http: HttpClient::new(retry)?,
            max_items,
        })
    }

    pub fn catalog(&self) -> &StacCatalog {
        &self.catalog
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// One page of results.
    pub async fn search(&self, params: &StacSearchParams) -> Result<StacItemCollection> {
        self.http.post_json(&self.catalog.search_url(), params).await
    }

    /// Search following `next` links, collecting up to `max_items` items.
    pub async fn search_all(&self, params: &StacSearchParams) -> Result<Vec<StacItem>> {
        let mut items: Vec<StacItem> = Vec::new();
        let mut page = self.search(params).await?;

        loop {
            let next = page.next_link().cloned();
            items.append(&mut page.features);
            if items.len() >= self.max_items {
                break;
            }
            match next {
                Some(link) => {
                    page = self.follow_next(&link, params).await?;
                    if page.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }

        items.truncate(self.max_items);
        debug!(catalog = ?self.catalog, items = items.len(), "search complete");
        Ok(items)
    }

    /// Signed href for Planetary Computer assets; other catalogs pass through.
    pub async fn sign_asset_href(&self, href: &str) -> Result<String> {
        if !self.catalog.needs_signing() {
            return Ok(href.to_string());
        }

        #[derive(Deserialize)]
        struct Signed {
            href: Option<String>,
        }

        let url = format!("{}?href={}", PC_SIGN_URL, href);
        let signed: Signed = self.http.get_json(&url).await?;
        signed
            .href
            .ok_or_else(|| CloudError::Auth("sign response missing 'href'".into()))
    }

    async fn follow_next(&self, link: &StacLink, original: &StacSearchParams) -> Result<StacItemCollection> {
        let method = link.method.as_deref().unwrap_or("GET").to_uppercase();
        if method != "POST" {
            return self.http.get_json(&link.href).await;
        }

        let body = next_page_body(link, original)?;
        self.http.post_json(&link.href, &body).await
    }
}

/// Request body for a POST `next` link.
///
/// With `merge` the link body overlays the original parameters; otherwise
/// it replaces them. A link without a body repeats the original request.
fn next_page_body(link: &StacLink, original: &StacSearchParams) -> Result<serde_json::Value> {
    let base = serde_json::to_value(original)?;
    let Some(link_body) = &link.body else {
        return Ok(base);
    };
    if !link.merge.unwrap_or(false) {
        return Ok(link_body.clone());
    }

    let mut merged = base;
    if let (Some(target), Some(overlay)) = (merged.as_object_mut(), link_body.as_object()) {
        for (k, v) in overlay {
            target.insert(k.clone(), v.clone());
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(body: Option<serde_json::Value>, merge: Option<bool>) -> StacLink {
        StacLink {
            rel: "next".into(),
            href: "https://example.com/search".into(),
            method: Some("POST".into()),
            body,
            merge,
        }
    }

    #[test]
    fn catalog_search_urls() {
        assert_eq!(
            StacCatalog::PlanetaryComputer.search_url(),
            "https://planetarycomputer.microsoft.com/api/stac/v1/search"
        );
        assert_eq!(
            StacCatalog::Custom("https://example.com/stac/".into()).search_url(),
            "https://example.com/stac/search"
        );
        assert_eq!(
            StacCatalog::Custom("https://example.com/stac/search".into()).search_url(),
            "https://example.com/stac/search"
        );
    }

    #[test]
    fn catalog_shorthands() {
        assert_eq!(StacCatalog::from_str_or_url("PC"), StacCatalog::PlanetaryComputer);
        assert_eq!(StacCatalog::from_str_or_url("es"), StacCatalog::EarthSearch);
        assert_eq!(
            StacCatalog::from_str_or_url("https://My-Stac.example"),
            StacCatalog::Custom("https://My-Stac.example".into())
        );
        assert!(StacCatalog::PlanetaryComputer.needs_signing());
        assert!(!StacCatalog::EarthSearch.needs_signing());
    }

    #[test]
    fn merged_next_body_overlays_token() {
        let params = StacSearchParams::new().collection("gpm").limit(10);
        let body = next_page_body(&link(Some(serde_json::json!({"token": "p2"})), Some(true)), &params).unwrap();
        assert_eq!(body["token"], "p2");
        assert_eq!(body["limit"], 10);
        assert_eq!(body["collections"], serde_json::json!(["gpm"]));
    }

    #[test]
    fn unmerged_next_body_replaces() {
        let params = StacSearchParams::new().limit(10);
        let body = next_page_body(&link(Some(serde_json::json!({"token": "p2"})), None), &params).unwrap();
        assert_eq!(body, serde_json::json!({"token": "p2"}));
        let body = next_page_body(&link(None, None), &params).unwrap();
        assert_eq!(body["limit"], 10);
    }

    #[tokio::test]
    #[ignore] // requires network
    async fn earth_search_landsat_january_2016() {
        use irrimetrics_core::{Region, TimeWindow};

        let client = StacClient::new(StacCatalog::EarthSearch, RetryPolicy::default(), 20).unwrap();
        let region = Region::around_point("patna", 85.14, 25.59, 0.2).unwrap();
        let params = StacSearchParams::new()
            .region(&region)
            .window(&TimeWindow::month(2016, chrono::Month::January).unwrap())
            .collection("landsat-c2-l2")
            .limit(10);
        let items = client.search_all(&params).await.unwrap();
        assert!(items.iter().all(|i| i.acquired().is_some()));
    }
}
