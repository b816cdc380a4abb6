use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{BookMetadata, Recommendation},
};

/// Seam to the optional book-metadata service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataClient: Send + Sync {
    /// Looks up metadata for one title/author pair; `None` when the
    /// service has no match
    async fn lookup_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> AppResult<Option<BookMetadata>>;
}

/// Google Books-style volumes provider
pub struct HttpMetadataClient {
    http_client: HttpClient,
    api_url: String,
}

impl HttpMetadataClient {
    pub fn new(api_url: String, timeout: Duration) -> Self {
        Self {
            http_client: HttpClient::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_url,
        }
    }
}

#[derive(Deserialize)]
struct VolumesResponse {
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Deserialize)]
struct Volume {
    #[serde(rename = "volumeInfo")]
    volume_info: VolumeInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    #[serde(default)]
    page_count: Option<u32>,
    #[serde(default)]
    average_rating: Option<f64>,
    #[serde(default)]
    ratings_count: Option<u64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    image_links: Option<ImageLinks>,
}

#[derive(Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    id_type: String,
    identifier: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    #[serde(default)]
    thumbnail: Option<String>,
}

impl From<VolumeInfo> for BookMetadata {
    fn from(info: VolumeInfo) -> Self {
        let isbn = info
            .industry_identifiers
            .iter()
            .find(|id| id.id_type == "ISBN_13")
            .or_else(|| info.industry_identifiers.first())
            .map(|id| id.identifier.clone());

        BookMetadata {
            isbn,
            page_count: info.page_count,
            average_rating: info.average_rating,
            ratings_count: info.ratings_count,
            thumbnail: info.image_links.and_then(|links| links.thumbnail),
            description: info.description,
        }
    }
}

#[async_trait::async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn lookup_by_title_author(
        &self,
        title: &str,
        author: &str,
    ) -> AppResult<Option<BookMetadata>> {
        let url = format!("{}/volumes", self.api_url);
        let query = format!("intitle:{} inauthor:{}", title, author);

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query.as_str()), ("maxResults", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(AppError::ExternalApi(format!(
                "Metadata API returned status {}",
                status
            )));
        }

        let volumes: VolumesResponse = response.json().await?;
        Ok(volumes
            .items
            .into_iter()
            .next()
            .map(|v| BookMetadata::from(v.volume_info)))
    }
}

/// Attaches metadata to recommendations, one lookup at a time with a
/// fixed delay between calls to respect the service's rate limits.
/// Per-item failures keep the un-enriched record and are never surfaced.
pub struct Enricher {
    client: Arc<dyn MetadataClient>,
    delay: Duration,
}

impl Enricher {
    pub fn new(client: Arc<dyn MetadataClient>, delay: Duration) -> Self {
        Self { client, delay }
    }

    pub async fn enrich(&self, mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        let mut enriched_count = 0;

        for (i, rec) in recommendations.iter_mut().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }

            match self
                .client
                .lookup_by_title_author(&rec.title, &rec.author)
                .await
            {
                Ok(Some(metadata)) => {
                    rec.metadata = Some(metadata);
                    enriched_count += 1;
                }
                Ok(None) => {
                    tracing::debug!(title = %rec.title, "No metadata found");
                }
                Err(e) => {
                    tracing::warn!(title = %rec.title, error = %e, "Metadata lookup failed");
                }
            }
        }

        tracing::debug!(
            enriched = enriched_count,
            total = recommendations.len(),
            "Enrichment pass finished"
        );

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecommendationSource;

    fn rec(title: &str) -> Recommendation {
        Recommendation {
            title: title.to_string(),
            author: "Author".to_string(),
            genre: "Fantasy".to_string(),
            reason: "test".to_string(),
            confidence: 0.7,
            themes: vec![],
            publication_year: None,
            source: RecommendationSource::AiGenerated,
            external_rating_data: None,
            metadata: None,
            combination_source: None,
            final_score: None,
        }
    }

    #[tokio::test]
    async fn test_enrichment_attaches_metadata() {
        let mut mock = MockMetadataClient::new();
        mock.expect_lookup_by_title_author().returning(|_, _| {
            Ok(Some(BookMetadata {
                isbn: Some("9780765326355".to_string()),
                page_count: Some(1007),
                ..Default::default()
            }))
        });

        let enricher = Enricher::new(Arc::new(mock), Duration::from_millis(0));
        let out = enricher.enrich(vec![rec("The Way of Kings")]).await;

        assert_eq!(out.len(), 1);
        let metadata = out[0].metadata.as_ref().unwrap();
        assert_eq!(metadata.isbn.as_deref(), Some("9780765326355"));
    }

    #[tokio::test]
    async fn test_per_item_failure_keeps_unenriched_record() {
        let mut mock = MockMetadataClient::new();
        let mut call = 0;
        mock.expect_lookup_by_title_author().returning(move |_, _| {
            call += 1;
            if call == 1 {
                Err(AppError::ExternalApi("timeout".to_string()))
            } else {
                Ok(Some(BookMetadata::default()))
            }
        });

        let enricher = Enricher::new(Arc::new(mock), Duration::from_millis(0));
        let out = enricher.enrich(vec![rec("First"), rec("Second")]).await;

        assert_eq!(out.len(), 2);
        assert!(out[0].metadata.is_none());
        assert!(out[1].metadata.is_some());
    }

    #[tokio::test]
    async fn test_no_match_leaves_record_untouched() {
        let mut mock = MockMetadataClient::new();
        mock.expect_lookup_by_title_author()
            .returning(|_, _| Ok(None));

        let enricher = Enricher::new(Arc::new(mock), Duration::from_millis(0));
        let out = enricher.enrich(vec![rec("Obscure Title")]).await;
        assert!(out[0].metadata.is_none());
    }

    #[test]
    fn test_volume_info_prefers_isbn13() {
        let info = VolumeInfo {
            industry_identifiers: vec![
                IndustryIdentifier {
                    id_type: "ISBN_10".to_string(),
                    identifier: "0765326353".to_string(),
                },
                IndustryIdentifier {
                    id_type: "ISBN_13".to_string(),
                    identifier: "9780765326355".to_string(),
                },
            ],
            page_count: None,
            average_rating: None,
            ratings_count: None,
            description: None,
            image_links: None,
        };

        let metadata: BookMetadata = info.into();
        assert_eq!(metadata.isbn.as_deref(), Some("9780765326355"));
    }
}
