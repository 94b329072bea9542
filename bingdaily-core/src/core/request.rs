use log::{debug, info};
use serde::Deserialize;

use crate::core::fetch::ResilientFetcher;
use crate::error::MetadataError;
use crate::services::{HttpTransport, Sleeper};

pub const BING_HOST: &str = "https://www.bing.com";
const ARCHIVE_PATH: &str = "/HPImageArchive.aspx";
// Bing serves the ultra-high-definition rendition at `<urlbase>_UHD.jpg`.
const UHD_SUFFIX: &str = "_UHD";
const IMAGE_EXTENSION: &str = ".jpg";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BingImage {
    pub url: Option<String>,
    pub urlbase: Option<String>,
    pub title: Option<String>,
    pub copyright: Option<String>,
    pub startdate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BingResponse {
    #[serde(default)]
    pub images: Vec<BingImage>,
}

/// The two URLs today's image can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub standard_url: String,
    pub high_res_url: String,
}

/// Where the metadata comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    host: String,
    market: Option<String>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::bing()
    }
}

impl Provider {
    pub fn bing() -> Self {
        Self {
            host: BING_HOST.to_string(),
            market: None,
        }
    }

    /// Restrict the archive to one market code, e.g. `en-US`.
    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn market(&self) -> Option<&str> {
        self.market.as_deref()
    }

    /// Archive URL asking for exactly one day, today's.
    pub fn metadata_url(&self) -> String {
        let mut url = format!("{}{}?format=js&idx=0&n=1", self.host, ARCHIVE_PATH);
        if let Some(market) = &self.market {
            url.push_str("&mkt=");
            url.push_str(market);
        }
        url
    }

    /// Build both candidate URLs from the archive's first image record.
    pub fn candidate_for(&self, image: &BingImage) -> Result<ImageCandidate, MetadataError> {
        let url = non_empty(&image.url).ok_or(MetadataError::MissingField("url"))?;
        let urlbase = non_empty(&image.urlbase).ok_or(MetadataError::MissingField("urlbase"))?;

        Ok(ImageCandidate {
            standard_url: format!("{}{}", self.host, url),
            high_res_url: format!("{}{}{}{}", self.host, urlbase, UHD_SUFFIX, IMAGE_EXTENSION),
        })
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

pub fn parse_bing_response(body: &[u8]) -> Result<BingImage, MetadataError> {
    let response: BingResponse = serde_json::from_slice(body)?;
    response.images.into_iter().next().ok_or(MetadataError::NoImages)
}

pub struct MetadataResolver<'a, T, S> {
    fetcher: &'a ResilientFetcher<T, S>,
    provider: &'a Provider,
}

impl<'a, T: HttpTransport, S: Sleeper> MetadataResolver<'a, T, S> {
    pub fn new(fetcher: &'a ResilientFetcher<T, S>, provider: &'a Provider) -> Self {
        Self { fetcher, provider }
    }

    /// Fetch today's metadata once and derive the standard and UHD image URLs.
    pub fn resolve_image_urls(&self) -> Result<ImageCandidate, MetadataError> {
        let url = self.provider.metadata_url();
        debug!("Fetching image metadata from {}", url);

        let body = self.fetcher.fetch(&url)?;
        let image = parse_bing_response(&body)?;
        let candidate = self.provider.candidate_for(&image)?;

        if let Some(title) = non_empty(&image.title) {
            info!("Image of the day: {}", title);
        }
        if let Some(copyright) = non_empty(&image.copyright) {
            info!("Copyright: {}", copyright);
        }
        debug!(
            "Candidates: standard={} uhd={}",
            candidate.standard_url, candidate.high_res_url
        );

        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fetch::RetryPolicy;
    use crate::testing::{RecordingSleeper, ScriptedTransport};

    const METADATA_URL: &str = "https://www.bing.com/HPImageArchive.aspx?format=js&idx=0&n=1";

    #[test]
    fn metadata_url_requests_one_image() {
        assert_eq!(Provider::bing().metadata_url(), METADATA_URL);
        assert_eq!(
            Provider::bing().with_market("de-DE").metadata_url(),
            format!("{METADATA_URL}&mkt=de-DE")
        );
    }

    #[test]
    fn builds_both_candidates() {
        let image = parse_bing_response(
            br#"{"images":[{"url":"/th?id=ABC","urlbase":"/th?id=ABCraw","title":"Philae"}]}"#,
        )
        .unwrap();
        let candidate = Provider::bing().candidate_for(&image).unwrap();
        assert_eq!(candidate.standard_url, "https://www.bing.com/th?id=ABC");
        assert_eq!(candidate.high_res_url, "https://www.bing.com/th?id=ABCraw_UHD.jpg");
    }

    #[test]
    fn only_first_image_is_used() {
        let image = parse_bing_response(
            br#"{"images":[{"url":"/a","urlbase":"/a"},{"url":"/b","urlbase":"/b"}]}"#,
        )
        .unwrap();
        assert_eq!(image.url.as_deref(), Some("/a"));
    }

    #[test]
    fn missing_or_empty_fields_are_rejected() {
        let missing = parse_bing_response(br#"{"images":[{"url":"/th?id=ABC"}]}"#).unwrap();
        assert!(matches!(
            Provider::bing().candidate_for(&missing),
            Err(MetadataError::MissingField("urlbase"))
        ));

        let empty = parse_bing_response(br#"{"images":[{"url":"","urlbase":"/x"}]}"#).unwrap();
        assert!(matches!(
            Provider::bing().candidate_for(&empty),
            Err(MetadataError::MissingField("url"))
        ));
    }

    #[test]
    fn envelope_without_images_is_rejected() {
        assert!(matches!(parse_bing_response(b"{}"), Err(MetadataError::NoImages)));
        assert!(matches!(
            parse_bing_response(br#"{"images":[]}"#),
            Err(MetadataError::NoImages)
        ));
        assert!(matches!(parse_bing_response(b"<html>"), Err(MetadataError::Json(_))));
    }

    #[test]
    fn resolver_fetches_metadata_exactly_once() {
        let transport = ScriptedTransport::default();
        transport.respond(
            METADATA_URL,
            Ok(br#"{"images":[{"url":"/th?id=ABC","urlbase":"/th?id=ABCraw"}]}"#.to_vec()),
        );
        let sleeper = RecordingSleeper::default();
        let fetcher = ResilientFetcher::with_services(&transport, &sleeper, RetryPolicy::default());
        let provider = Provider::bing();

        let candidate = MetadataResolver::new(&fetcher, &provider).resolve_image_urls().unwrap();
        assert_eq!(candidate.high_res_url, "https://www.bing.com/th?id=ABCraw_UHD.jpg");
        assert_eq!(transport.requests(), vec![METADATA_URL.to_string()]);
    }

    #[test]
    fn resolver_surfaces_exhausted_fetch() {
        let transport = ScriptedTransport::default();
        let sleeper = RecordingSleeper::default();
        let fetcher = ResilientFetcher::with_services(&transport, &sleeper, RetryPolicy::default());
        let provider = Provider::bing();

        let err = MetadataResolver::new(&fetcher, &provider).resolve_image_urls().unwrap_err();
        assert!(matches!(err, MetadataError::Fetch(ref e) if e.attempts == 5));
    }
}
