use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;

use crate::weight::WeightCoefficients;

use super::dto::{
    CategoryCountBody, CyElement, EntityDto, EvidenceDto, InteractionElements, NodeWeightsRequest,
    NodesList, SearchResponse, SubgraphDto, SubgraphRequest, WeightsBody, partition_elements,
};

/// Blocking HTTP client for the graph-data backend. Cheap to clone;
/// every fetch runs on a worker thread, never on the UI thread.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn best_subgraph(&self, seeds: &[String], counts: [u32; 4]) -> Result<SubgraphDto> {
        let request = SubgraphRequest {
            nodes: NodesList {
                nodes: seeds.to_vec(),
            },
            category_count: CategoryCountBody::from_counts(counts),
        };

        let url = format!("{}/viz_api/getbestsubgraph", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .with_context(|| format!("subgraph request to {url} failed"))?;
        Self::check_status(&url, &response)?;
        response.json().context("invalid subgraph response body")
    }

    pub fn node_weights(
        &self,
        nodes: &[String],
        coefficients: &WeightCoefficients,
    ) -> Result<HashMap<String, f64>> {
        let request = NodeWeightsRequest {
            nodes: NodesList {
                nodes: nodes.to_vec(),
            },
            weights: WeightsBody {
                weights: *coefficients,
            },
        };

        let url = format!("{}/viz_api/getnodeweights", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .with_context(|| format!("node weight request to {url} failed"))?;
        Self::check_status(&url, &response)?;
        response.json().context("invalid node weight response body")
    }

    pub fn interaction(
        &self,
        source: &str,
        destination: &str,
        bidirectional: bool,
    ) -> Result<InteractionElements> {
        let url = format!(
            "{}/interaction/{source}/{destination}/{bidirectional}",
            self.base_url
        );
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("interaction request to {url} failed"))?;
        Self::check_status(&url, &response)?;
        let elements: Vec<CyElement> = response
            .json()
            .context("invalid interaction response body")?;
        Ok(partition_elements(elements))
    }

    pub fn search_nodes(&self, text: &str, limit: usize) -> Result<Vec<EntityDto>> {
        let url = format!("{}/viz_api/searchnode/{text}/{limit}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("entity search request to {url} failed"))?;
        Self::check_status(&url, &response)?;
        let results: SearchResponse = response.json().context("invalid search response body")?;
        Ok(results.matches)
    }

    pub fn synonyms(&self, entity_id: &str) -> Result<Vec<String>> {
        let url = format!("{}/synonyms/{entity_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("synonym request to {url} failed"))?;
        Self::check_status(&url, &response)?;
        response.json().context("invalid synonym response body")
    }

    pub fn evidence(
        &self,
        source: &str,
        destination: &str,
        polarity: &str,
    ) -> Result<Vec<EvidenceDto>> {
        let url = format!(
            "{}/evidence/{source}/{destination}/{polarity}",
            self.base_url
        );
        let response = self
            .http
            .get(&url)
            .send()
            .with_context(|| format!("evidence request to {url} failed"))?;
        Self::check_status(&url, &response)?;
        response.json().context("invalid evidence response body")
    }

    fn check_status(url: &str, response: &reqwest::blocking::Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(anyhow!("{url} returned {status}"))
        }
    }
}
