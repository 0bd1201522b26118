//! Reference data and the built-in framework catalog.
//!
//! Preset heuristics and success-factor definitions normally come from a
//! reference endpoint at plan-creation time. When that endpoint cannot be
//! reached, the embedded defaults in `reference.toml` are used instead.
//! The good-practice framework catalog is always embedded
//! (`frameworks.toml`).

use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{PerStage, Stage};

/// A starter heuristic offered to new plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetHeuristic {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub notes: String,
}

/// A success factor and the tasks it suggests for each stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessFactor {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub tasks: PerStage<Vec<String>>,
}

/// Preset heuristics and success factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub heuristics: Vec<PresetHeuristic>,
    #[serde(default)]
    pub factors: Vec<SuccessFactor>,
}

impl ReferenceData {
    /// The embedded default set.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. The file is compiled in,
    /// so a built binary always carries a valid copy.
    pub fn embedded() -> Self {
        toml::from_str(REFERENCE_TOML).expect("embedded reference.toml is invalid")
    }

    pub fn factor(&self, id: &str) -> Option<&SuccessFactor> {
        self.factors.iter().find(|f| f.id == id)
    }

    /// Suggested task texts for a factor in a stage (empty if unknown).
    pub fn factor_tasks(&self, id: &str, stage: Stage) -> &[String] {
        match self.factor(id) {
            Some(factor) => factor.tasks.get(stage).as_slice(),
            None => &[],
        }
    }

    fn is_empty(&self) -> bool {
        self.heuristics.is_empty() && self.factors.is_empty()
    }
}

/// Errors from the reference endpoint. Only used internally before falling
/// back; callers of [`fetch_reference_data`] never see them.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reference endpoint returned no heuristics or factors")]
    Empty,
}

/// Fetch reference data from `url`, falling back to [`ReferenceData::embedded`]
/// on any failure (unreachable host, timeout, non-2xx status, bad JSON, or
/// an empty payload).
pub async fn fetch_reference_data(url: &str, timeout: Duration) -> ReferenceData {
    match try_fetch(url, timeout).await {
        Ok(data) => {
            info!(
                url,
                heuristics = data.heuristics.len(),
                factors = data.factors.len(),
                "loaded reference data"
            );
            data
        }
        Err(e) => {
            warn!(url, error = %e, "reference endpoint unavailable, using embedded defaults");
            ReferenceData::embedded()
        }
    }
}

async fn try_fetch(url: &str, timeout: Duration) -> Result<ReferenceData, ReferenceError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let data: ReferenceData = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    if data.is_empty() {
        return Err(ReferenceError::Empty);
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Framework catalog
// ---------------------------------------------------------------------------

/// A built-in good-practice framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkDef {
    /// Stable identifier stored in plan records.
    pub code: String,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub tasks: PerStage<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct FrameworkLibrary {
    frameworks: Vec<FrameworkDef>,
}

static REFERENCE_TOML: &str = include_str!("reference.toml");
static FRAMEWORKS_TOML: &str = include_str!("frameworks.toml");

/// The built-in framework catalog, parsed on first use.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed.
pub fn framework_catalog() -> &'static [FrameworkDef] {
    static CATALOG: OnceLock<Vec<FrameworkDef>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let lib: FrameworkLibrary =
            toml::from_str(FRAMEWORKS_TOML).expect("embedded frameworks.toml is invalid");
        lib.frameworks
    })
}

pub fn framework_by_code(code: &str) -> Option<&'static FrameworkDef> {
    framework_catalog().iter().find(|f| f.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::{Zone, frameworks_for_zone};

    #[test]
    fn embedded_reference_is_nonempty() {
        let data = ReferenceData::embedded();
        assert!(data.heuristics.len() >= 3);
        assert_eq!(data.factors.len(), 12);
    }

    #[test]
    fn factor_tasks_by_stage() {
        let data = ReferenceData::embedded();
        let tasks = data.factor_tasks("F3", Stage::Delivery);
        assert_eq!(tasks, ["Run user testing before each release".to_string()]);
        assert!(data.factor_tasks("F3", Stage::Closure).is_empty());
        assert!(data.factor_tasks("F99", Stage::Delivery).is_empty());
    }

    #[test]
    fn factor_ids_are_unique() {
        let data = ReferenceData::embedded();
        let mut ids: Vec<&str> = data.factors.iter().map(|f| f.id.as_str()).collect();
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len);
    }

    #[test]
    fn every_recommended_framework_is_in_catalog() {
        for zone in Zone::ALL {
            for code in frameworks_for_zone(zone) {
                assert!(
                    framework_by_code(code).is_some(),
                    "{zone} recommends {code:?} which is not in the catalog"
                );
            }
        }
    }

    #[test]
    fn catalog_codes_are_unique() {
        let catalog = framework_catalog();
        let mut codes: Vec<&str> = catalog.iter().map(|f| f.code.as_str()).collect();
        let len = codes.len();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), len);
    }

    #[test]
    fn catalog_is_parsed_once() {
        let first = framework_catalog();
        let second = framework_catalog();
        assert!(std::ptr::eq(first, second));
        let prince2 = framework_by_code("PRINCE2").unwrap();
        assert!(first.iter().any(|f| std::ptr::eq(f, prince2)));
    }

    #[test]
    fn prince2_has_tasks_in_every_stage() {
        let prince2 = framework_by_code("PRINCE2").unwrap();
        for (stage, tasks) in prince2.tasks.iter() {
            assert!(!tasks.is_empty(), "no PRINCE2 tasks for {stage}");
        }
    }

    #[tokio::test]
    async fn unreachable_endpoint_falls_back_to_embedded() {
        let data =
            fetch_reference_data("http://127.0.0.1:9/reference", Duration::from_millis(500)).await;
        assert_eq!(data, ReferenceData::embedded());
    }

    #[tokio::test]
    async fn fetches_remote_reference_data() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/reference")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "heuristics": [{"id": "R1", "text": "Remote heuristic"}],
                    "factors": [{"id": "F1", "title": "Remote factor", "Delivery": ["Ship it"]}]
                }"#,
            )
            .create_async()
            .await;

        let url = format!("{}/reference", server.url());
        let data = fetch_reference_data(&url, Duration::from_secs(5)).await;

        mock.assert_async().await;
        assert_eq!(data.heuristics[0].text, "Remote heuristic");
        assert_eq!(data.factor_tasks("F1", Stage::Delivery), ["Ship it".to_string()]);
    }

    #[tokio::test]
    async fn server_error_falls_back_to_embedded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/reference")
            .with_status(503)
            .create_async()
            .await;

        let url = format!("{}/reference", server.url());
        let data = fetch_reference_data(&url, Duration::from_secs(5)).await;
        assert_eq!(data, ReferenceData::embedded());
    }

    #[tokio::test]
    async fn empty_payload_falls_back_to_embedded() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/reference")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let url = format!("{}/reference", server.url());
        let data = fetch_reference_data(&url, Duration::from_secs(5)).await;
        assert_eq!(data, ReferenceData::embedded());
    }
}
