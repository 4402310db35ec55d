//! NuGet V3 registry implementation
//!
//! A feed is opened by resolving the source's service index into two resource
//! URLs: the registration base (per-package metadata blobs) and the search
//! query service (owner lookup).

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{OWNER_SEARCH_TAKE, USER_AGENT};
use crate::registry::error::RegistryError;
use crate::registry::feed::{FeedProvider, MetadataFeed};
use crate::registry::select::parse_version;
use crate::registry::source::RegistrySource;
use crate::registry::types::{CandidateMetadata, LicenseInfo};

/// Registration resource types, in preference order.
const REGISTRATION_TYPES: &[&str] = &[
    "RegistrationsBaseUrl/3.6.0",
    "RegistrationsBaseUrl/3.4.0",
    "RegistrationsBaseUrl",
];

/// Search resource types, in preference order.
const SEARCH_TYPES: &[&str] = &["SearchQueryService/3.5.0", "SearchQueryService"];

/// Service index response
#[derive(Debug, Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: String,
}

impl ServiceIndex {
    /// Find the resource URL for the first matching type in `preferred`.
    fn resource_url(&self, preferred: &[&str]) -> Option<&str> {
        preferred.iter().find_map(|kind| {
            self.resources
                .iter()
                .find(|r| r.kind == *kind)
                .map(|r| r.id.as_str())
        })
    }
}

/// Registration index response: pages of version leaves
#[derive(Debug, Deserialize)]
struct RegistrationIndex {
    items: Vec<RegistrationPage>,
}

#[derive(Debug, Deserialize)]
struct RegistrationPage {
    /// Absent when the page document is fetched directly; only index entries
    /// need it to locate the page.
    #[serde(rename = "@id", default)]
    id: String,
    /// Inline leaves. Absent for large packages, in which case the page must
    /// be fetched separately via its `@id`.
    items: Option<Vec<RegistrationLeaf>>,
}

#[derive(Debug, Deserialize)]
struct RegistrationLeaf {
    #[serde(rename = "catalogEntry")]
    catalog_entry: CatalogEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogEntry {
    id: String,
    version: String,
    #[serde(default)]
    authors: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    license_expression: Option<String>,
    #[serde(default)]
    license_url: Option<String>,
    #[serde(default)]
    project_url: Option<String>,
    /// Absent on older feeds, which only publish listed versions.
    #[serde(default)]
    listed: Option<bool>,
}

impl CatalogEntry {
    fn into_candidate(self) -> CandidateMetadata {
        let license = match self.license_expression.filter(|e| !e.is_empty()) {
            Some(expression) => Some(LicenseInfo::Expression(expression)),
            None => self
                .license_url
                .filter(|u| !u.is_empty())
                .map(LicenseInfo::Url),
        };
        CandidateMetadata {
            identifier: self.id,
            version: self.version,
            authors: self.authors,
            description: self.description.filter(|d| !d.is_empty()),
            license,
            project_url: self.project_url.filter(|u| !u.is_empty()),
            listed: self.listed.unwrap_or(true),
        }
    }
}

/// Search query response, used for owner lookup
#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    owners: Owners,
}

/// nuget.org reports owners as an array; some feeds use a single string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Owners {
    One(String),
    Many(Vec<String>),
}

impl Default for Owners {
    fn default() -> Self {
        Owners::Many(Vec::new())
    }
}

impl Owners {
    fn join(self) -> String {
        match self {
            Owners::One(owner) => owner,
            Owners::Many(owners) => owners.join(", "),
        }
    }
}

/// Feed provider that resolves NuGet V3 service indexes.
pub struct NuGetProvider {
    client: reqwest::Client,
}

impl NuGetProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for NuGetProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FeedProvider for NuGetProvider {
    async fn connect(
        &self,
        source: &RegistrySource,
    ) -> Result<Arc<dyn MetadataFeed>, RegistryError> {
        let connection_error = |reason: String| RegistryError::Connection {
            url: source.to_string(),
            reason,
        };

        debug!("Resolving service index for {}", source);
        let response = self
            .client
            .get(source.url().as_str())
            .send()
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(connection_error(format!("Unexpected status: {status}")));
        }

        let index: ServiceIndex = response
            .json()
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let registration_base = index
            .resource_url(REGISTRATION_TYPES)
            .ok_or_else(|| connection_error("No registration resource in service index".into()))?
            .trim_end_matches('/')
            .to_string();
        let search_url = index
            .resource_url(SEARCH_TYPES)
            .ok_or_else(|| connection_error("No search resource in service index".into()))?
            .to_string();

        debug!(
            "Connected to {}: registrations at {}, search at {}",
            source, registration_base, search_url
        );
        Ok(Arc::new(NuGetFeed {
            client: self.client.clone(),
            registration_base,
            search_url,
        }))
    }
}

/// An opened NuGet feed: the shared HTTP client plus the resource URLs
/// resolved from one source's service index.
#[derive(Debug)]
pub struct NuGetFeed {
    client: reqwest::Client,
    registration_base: String,
    search_url: String,
}

impl NuGetFeed {
    /// Fetch a registration page that had no inline leaves.
    async fn fetch_page(&self, url: &str) -> Result<Vec<RegistrationLeaf>, RegistryError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Registration page returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {status}"
            )));
        }

        let page: RegistrationPage = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        Ok(page.items.unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl MetadataFeed for NuGetFeed {
    async fn fetch_candidates(
        &self,
        identifier: &str,
        include_prerelease: bool,
        include_unlisted: bool,
    ) -> Result<Vec<CandidateMetadata>, RegistryError> {
        let url = format!(
            "{}/{}/index.json",
            self.registration_base,
            identifier.to_lowercase()
        );

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        // An unknown package is a valid empty result, not a fetch failure.
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("No registration index for {}", identifier);
            return Ok(Vec::new());
        }

        if !status.is_success() {
            warn!("Registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {status}"
            )));
        }

        let index: RegistrationIndex = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        let mut candidates = Vec::new();
        for page in index.items {
            let leaves = match page.items {
                Some(leaves) => leaves,
                None => self.fetch_page(&page.id).await?,
            };
            candidates.extend(leaves.into_iter().map(|leaf| leaf.catalog_entry.into_candidate()));
        }

        candidates.retain(|c| {
            (include_unlisted || c.listed)
                && (include_prerelease
                    || parse_version(&c.version).is_none_or(|v| v.pre.is_empty()))
        });

        debug!("Fetched {} candidates for {}", candidates.len(), identifier);
        Ok(candidates)
    }

    async fn fetch_owners(&self, identifier: &str) -> Result<String, RegistryError> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", format!("packageid:{identifier}")),
                ("prerelease", "false".to_string()),
                ("skip", "0".to_string()),
                ("take", OWNER_SEARCH_TAKE.to_string()),
                ("semVerLevel", "2.0.0".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Search returned status {} for {}", status, identifier);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {status}"
            )));
        }

        let result: SearchResponse = response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;

        // The query is identifier-scoped, so the top-ranked hit is the one.
        Ok(result
            .data
            .into_iter()
            .next()
            .map(|hit| hit.owners.join())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Server, ServerGuard};
    use serde_json::json;

    /// Serve a service index pointing registration and search at the server
    /// itself, then connect to it.
    async fn connect_to(server: &mut ServerGuard) -> Arc<dyn MetadataFeed> {
        let base = server.url();
        server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "version": "3.0.0",
                    "resources": [
                        {"@id": format!("{base}/registration/"), "@type": "RegistrationsBaseUrl/3.6.0"},
                        {"@id": format!("{base}/query"), "@type": "SearchQueryService"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let source = RegistrySource::parse(&format!("{base}/index.json")).unwrap();
        NuGetProvider::new().connect(&source).await.unwrap()
    }

    fn leaf(version: &str, listed: bool) -> serde_json::Value {
        json!({"catalogEntry": {
            "id": "Foo", "version": version, "authors": "Contoso",
            "description": "A test package", "licenseExpression": "MIT",
            "projectUrl": "https://example.com/foo", "listed": listed
        }})
    }

    #[tokio::test]
    async fn connect_resolves_resources_from_service_index() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        let mock = server
            .mock("GET", "/registration/foo/index.json")
            .with_status(404)
            .create_async()
            .await;

        let candidates = feed.fetch_candidates("Foo", true, false).await.unwrap();
        mock.assert_async().await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn connect_fails_on_unreachable_source() {
        let source = RegistrySource::parse("http://127.0.0.1:1/index.json").unwrap();
        let result = NuGetProvider::new().connect(&source).await;

        assert!(matches!(
            result.map(|_| ()),
            Err(RegistryError::Connection { .. })
        ));
    }

    #[tokio::test]
    async fn connect_fails_when_registration_resource_missing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"version": "3.0.0", "resources": []}).to_string())
            .create_async()
            .await;

        let source = RegistrySource::parse(&format!("{}/index.json", server.url())).unwrap();
        let result = NuGetProvider::new().connect(&source).await;

        assert!(matches!(
            result.map(|_| ()),
            Err(RegistryError::Connection { .. })
        ));
    }

    #[tokio::test]
    async fn fetch_candidates_returns_inline_leaves() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        let mock = server
            .mock("GET", "/registration/foo/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"count": 1, "items": [{
                    "@id": format!("{}/registration/foo/page0.json", server.url()),
                    "items": [leaf("1.0.0", true), leaf("2.0.0", true)]
                }]})
                .to_string(),
            )
            .create_async()
            .await;

        let candidates = feed.fetch_candidates("Foo", true, false).await.unwrap();

        mock.assert_async().await;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].identifier, "Foo");
        assert_eq!(candidates[0].version, "1.0.0");
        assert_eq!(candidates[0].authors, "Contoso");
        assert_eq!(
            candidates[0].license,
            Some(LicenseInfo::Expression("MIT".to_string()))
        );
        assert_eq!(
            candidates[0].project_url.as_deref(),
            Some("https://example.com/foo")
        );
    }

    #[tokio::test]
    async fn fetch_candidates_follows_external_pages() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        server
            .mock("GET", "/registration/foo/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"count": 1, "items": [{
                    "@id": format!("{}/registration/foo/page0.json", server.url()),
                    "count": 1
                }]})
                .to_string(),
            )
            .create_async()
            .await;
        let page = server
            .mock("GET", "/registration/foo/page0.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"items": [leaf("1.0.0", true)]}).to_string())
            .create_async()
            .await;

        let candidates = feed.fetch_candidates("Foo", true, false).await.unwrap();

        page.assert_async().await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].version, "1.0.0");
    }

    #[tokio::test]
    async fn fetch_candidates_filters_unlisted_versions() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        server
            .mock("GET", "/registration/foo/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"count": 1, "items": [
                    {"@id": "page", "items": [leaf("1.0.0", false), leaf("2.0.0", true)]}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let candidates = feed.fetch_candidates("Foo", true, false).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].version, "2.0.0");
    }

    #[tokio::test]
    async fn fetch_candidates_filters_prereleases_when_excluded() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        server
            .mock("GET", "/registration/foo/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"count": 1, "items": [
                    {"@id": "page", "items": [leaf("2.1.0-beta", true), leaf("2.0.0", true)]}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let candidates = feed.fetch_candidates("Foo", false, false).await.unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].version, "2.0.0");
    }

    #[tokio::test]
    async fn fetch_candidates_propagates_server_errors() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        server
            .mock("GET", "/registration/foo/index.json")
            .with_status(500)
            .create_async()
            .await;

        let result = feed.fetch_candidates("Foo", true, false).await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn fetch_owners_joins_owner_array_of_first_hit() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        let mock = server
            .mock("GET", "/query")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("q".into(), "packageid:Foo".into()),
                mockito::Matcher::UrlEncoded("prerelease".into(), "false".into()),
                mockito::Matcher::UrlEncoded("take".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"totalHits": 1, "data": [
                    {"id": "Foo", "version": "2.0.0", "owners": ["alice", "bob"]}
                ]})
                .to_string(),
            )
            .create_async()
            .await;

        let owners = feed.fetch_owners("Foo").await.unwrap();

        mock.assert_async().await;
        assert_eq!(owners, "alice, bob");
    }

    #[tokio::test]
    async fn fetch_owners_accepts_single_string_owners() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        server
            .mock("GET", "/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"totalHits": 1, "data": [{"id": "Foo", "owners": "alice"}]}).to_string())
            .create_async()
            .await;

        let owners = feed.fetch_owners("Foo").await.unwrap();
        assert_eq!(owners, "alice");
    }

    #[tokio::test]
    async fn fetch_owners_returns_empty_string_without_hits() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        server
            .mock("GET", "/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"totalHits": 0, "data": []}).to_string())
            .create_async()
            .await;

        let owners = feed.fetch_owners("Foo").await.unwrap();
        assert_eq!(owners, "");
    }

    #[tokio::test]
    async fn fetch_owners_propagates_server_errors() {
        let mut server = Server::new_async().await;
        let feed = connect_to(&mut server).await;

        server
            .mock("GET", "/query")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = feed.fetch_owners("Foo").await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }
}
