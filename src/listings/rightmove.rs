use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::app::ports::{HttpClientPort, ListingSource};
use crate::constants::{RIGHTMOVE_MAX_PAGES, RIGHTMOVE_RESULTS_PER_PAGE, RIGHTMOVE_SOURCE};
use crate::error::{FlatFinderError, Result};
use crate::table::ListingTable;
use crate::types::Listing;

/// Listings parsed from one search results page.
#[derive(Debug, Default)]
pub struct SearchPage {
    pub listings: Vec<Listing>,
    /// Total reported by the page header, across all pages.
    pub result_count: Option<usize>,
}

/// Scrapes a Rightmove search results URL, following pagination.
pub struct RightmoveSource {
    http: Arc<dyn HttpClientPort>,
    search_url: String,
    max_pages: usize,
}

impl RightmoveSource {
    pub fn new(http: Arc<dyn HttpClientPort>, search_url: impl Into<String>) -> Self {
        Self {
            http,
            search_url: search_url.into(),
            max_pages: RIGHTMOVE_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.clamp(1, RIGHTMOVE_MAX_PAGES);
        self
    }

    async fn fetch_page(&self, page: usize, base: &Url) -> Result<Option<SearchPage>> {
        let query = if page == 0 {
            Vec::new()
        } else {
            vec![("index", (page * RIGHTMOVE_RESULTS_PER_PAGE).to_string())]
        };
        let resp = self
            .http
            .get(&self.search_url, &query)
            .await
            .map_err(|message| FlatFinderError::Source { message })?;

        if !resp.is_ok() {
            if page == 0 {
                return Err(FlatFinderError::Source {
                    message: format!("search page returned HTTP {}", resp.status),
                });
            }
            warn!("⚠️ Page {} returned HTTP {}, stopping", page, resp.status);
            return Ok(None);
        }

        let html = String::from_utf8_lossy(&resp.bytes);
        parse_search_page(&html, base).map(Some)
    }
}

#[async_trait]
impl ListingSource for RightmoveSource {
    fn source_name(&self) -> &'static str {
        RIGHTMOVE_SOURCE
    }

    #[instrument(skip(self), fields(url = %self.search_url))]
    async fn fetch_table(&self) -> Result<ListingTable> {
        let base = Url::parse(&self.search_url).map_err(|e| FlatFinderError::Source {
            message: format!("invalid search URL '{}': {e}", self.search_url),
        })?;
        let search_date = chrono::Utc::now().to_rfc3339();

        let mut listings: Vec<Listing> = Vec::new();
        let mut seen = HashSet::new();

        for page in 0..self.max_pages {
            info!("📄 Scraping page {}", page + 1);
            let Some(parsed) = self.fetch_page(page, &base).await? else { break };

            if parsed.listings.is_empty() {
                info!("🏁 No listings on page {}, stopping", page + 1);
                break;
            }

            let found = parsed.listings.len();
            for listing in parsed.listings {
                let key = listing
                    .attributes
                    .get("url")
                    .and_then(|u| u.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| listing.address.clone());
                if seen.insert(key) {
                    listings.push(listing.with_attribute("search_date", search_date.clone()));
                }
            }
            debug!("Page {} had {} listings ({} total)", page + 1, found, listings.len());

            if let Some(total) = parsed.result_count {
                if listings.len() >= total {
                    break;
                }
            }
        }

        info!("✅ Scraped {} listings", listings.len());
        Ok(ListingTable::new(listings))
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| FlatFinderError::Source {
        message: format!("bad selector '{css}': {e}"),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse one Rightmove results page. Cards without an address (featured
/// placeholders) are skipped.
pub fn parse_search_page(html: &str, base: &Url) -> Result<SearchPage> {
    let document = Html::parse_document(html);
    let card_sel = selector("div.l-searchResult")?;
    let price_sel = selector(".propertyCard-priceValue")?;
    let title_sel = selector(".propertyCard-title")?;
    let address_sel = selector("address.propertyCard-address")?;
    let link_sel = selector("a.propertyCard-link")?;
    let agent_sel = selector("a.propertyCard-branchLogo-link")?;
    let count_sel = selector(".searchHeader-resultCount")?;

    let result_count = document
        .select(&count_sel)
        .next()
        .and_then(|e| parse_digits(&element_text(e)));

    let mut listings = Vec::new();
    for card in document.select(&card_sel) {
        let address = card.select(&address_sel).next().map(element_text).unwrap_or_default();
        if address.is_empty() {
            continue;
        }

        let mut listing = Listing::new(address).with_attribute("source", RIGHTMOVE_SOURCE);

        if let Some(price) = card.select(&price_sel).next().map(element_text) {
            if let Some(value) = parse_digits(&price) {
                listing = listing.with_attribute("price", value as u64);
            }
            listing = listing.with_attribute("price_text", price);
        }
        if let Some(title) = card.select(&title_sel).next().map(element_text) {
            if let Some(bedrooms) = parse_bedrooms(&title) {
                listing = listing.with_attribute("number_bedrooms", bedrooms as u64);
            }
            listing = listing.with_attribute("type", title);
        }
        if let Some(url) = card
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| base.join(href).ok())
        {
            listing = listing.with_attribute("url", url.to_string());
        }
        if let Some(url) = card
            .select(&agent_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| base.join(href).ok())
        {
            listing = listing.with_attribute("agent_url", url.to_string());
        }

        listings.push(listing);
    }

    Ok(SearchPage {
        listings,
        result_count,
    })
}

/// "£1,850 pcm" -> 1850
fn parse_digits(text: &str) -> Option<usize> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// "2 bedroom flat" -> 2, "Studio flat" -> 0
fn parse_bedrooms(title: &str) -> Option<usize> {
    if title.to_ascii_lowercase().contains("studio") {
        return Some(0);
    }
    title.split_whitespace().next().and_then(|w| w.parse().ok())
}
