use async_trait::async_trait;

use crate::error::Result;
use crate::table::ListingTable;

/// Outbound HTTP GET used by the mapping lookups and the listing scraper.
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Anything that can produce the initial table of listings.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Short name used in logs.
    fn source_name(&self) -> &'static str;

    async fn fetch_table(&self) -> Result<ListingTable>;
}
