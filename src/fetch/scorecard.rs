//! Paged download of the institution table from the College Scorecard API.

use anyhow::{Context, Result, ensure};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use crate::fetch::auth::UrlParam;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::fields::{FieldKeys, ID};
use crate::raw::write_raw_table;

pub const SCORECARD_URL: &str = "https://api.data.gov/ed/collegescorecard/v1/schools.json";

pub const PER_PAGE: usize = 100;

/// Predominantly bachelor's-granting, operating, public or private
/// nonprofit.
pub const SCHOOL_FILTERS: &[(&str, &str)] = &[
    ("school.degrees_awarded.predominant", "3"),
    ("school.operating", "1"),
    ("school.ownership", "1,2"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct PageMetadata {
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// One page of API results; each result is a flat `field -> value` map.
#[derive(Debug, Clone, Deserialize)]
pub struct ScorecardPage {
    pub metadata: PageMetadata,
    pub results: Vec<Map<String, Value>>,
}

impl PageMetadata {
    /// Exclusive upper bound of the page numbers to request.
    pub fn last_page(&self) -> usize {
        self.total / self.per_page.max(1) + 1
    }
}

/// A raw table row as cells keyed by field name.
pub type RawRow = HashMap<String, String>;

/// Converts a JSON value to its CSV cell. `null` becomes an empty cell.
pub fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_row(result: &Map<String, Value>) -> RawRow {
    result.iter().map(|(k, v)| (k.clone(), cell(v))).collect()
}

/// Checks the fetched rows against the reported total and for unique ids.
pub fn validate_rows(rows: &[RawRow], expected_total: usize) -> Result<()> {
    ensure!(
        rows.len() == expected_total,
        "fetched {} rows but the API reported {} in total",
        rows.len(),
        expected_total
    );

    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        let id = row.get(ID).map(String::as_str).unwrap_or("");
        ensure!(seen.insert(id), "duplicate institution id {:?}", id);
    }
    Ok(())
}

/// Client for the `schools` endpoint.
pub struct ScorecardClient<C> {
    client: C,
    base_url: String,
    fields: Vec<String>,
}

impl<C: HttpClient> ScorecardClient<C> {
    pub fn new(client: C, fields: Vec<String>) -> Self {
        Self {
            client,
            base_url: SCORECARD_URL.to_string(),
            fields,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Query URL for one page, without credentials.
    pub fn page_url(&self, page: usize) -> Result<Url> {
        let mut params: Vec<(&str, String)> = SCHOOL_FILTERS
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        params.push(("_per_page", PER_PAGE.to_string()));
        params.push(("_page", page.to_string()));
        params.push(("_fields", self.fields.join(",")));

        Url::parse_with_params(&self.base_url, &params)
            .with_context(|| format!("invalid API url {}", self.base_url))
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_page(&self, page: usize) -> Result<ScorecardPage> {
        let bytes = fetch_bytes(&self.client, self.page_url(page)?)
            .await
            .with_context(|| format!("failed to fetch page {page}"))?;
        let parsed: ScorecardPage = serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid JSON on page {page}"))?;

        debug!(
            page,
            rows = parsed.results.len(),
            total = parsed.metadata.total,
            "Page fetched"
        );
        Ok(parsed)
    }

    /// Fetches every page in order and validates the combined rows.
    pub async fn fetch_all(&self) -> Result<Vec<RawRow>> {
        let first = self.fetch_page(0).await?;
        let total = first.metadata.total;
        let last_page = first.metadata.last_page();
        info!(total, pages = last_page, "Fetching institutions");

        let mut rows: Vec<RawRow> = first.results.iter().map(to_row).collect();
        for page in 1..last_page {
            let next = self.fetch_page(page).await?;
            rows.extend(next.results.iter().map(to_row));
        }

        validate_rows(&rows, total)?;
        Ok(rows)
    }
}

/// Downloads every institution for `keys` and writes the raw table.
#[tracing::instrument(skip_all, fields(
    raw = %raw_path.as_ref().display(),
    year = keys.year,
))]
pub async fn run_fetch(
    raw_path: impl AsRef<Path>,
    keys: &FieldKeys,
    api_key: String,
) -> Result<usize> {
    let client = UrlParam::api_key(BasicClient::new()?, api_key);
    let headers = keys.requested_fields();
    let scorecard = ScorecardClient::new(client, headers.clone());

    let rows = scorecard.fetch_all().await?;
    write_raw_table(&raw_path, &headers, &rows)?;

    info!(rows = rows.len(), "Raw table written");
    Ok(rows.len())
}
