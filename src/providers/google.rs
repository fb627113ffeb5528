use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{
    GoogleCredentials, GOOGLE_BATCH_DELAY_MS, GOOGLE_GEO_KR, GOOGLE_LANGUAGE_KO,
    GOOGLE_MAX_KEYWORDS_PER_REQUEST,
};
use crate::error::{AppError, ProviderFailure, Result};
use crate::normalize::KeywordLookup;
use crate::providers::KeywordProvider;
use crate::types::{Competition, KeywordIdea, NormalizedRow, SecondaryMetric};

const PROVIDER: &str = "google";

/// Stop following `nextPageToken` after this many pages for one batch.
const MAX_IDEA_PAGES: usize = 50;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateKeywordIdeasRequest<'a> {
    language: &'a str,
    geo_target_constants: [&'a str; 1],
    keyword_plan_network: &'a str,
    keyword_seed: KeywordSeed<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct KeywordSeed<'a> {
    keywords: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateKeywordIdeasResponse {
    #[serde(default)]
    results: Vec<RawKeywordIdea>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawKeywordIdea {
    text: Option<String>,
    #[serde(default)]
    keyword_idea_metrics: Option<RawIdeaMetrics>,
}

/// int64 fields arrive as JSON strings, enums as names; both are accepted
/// alongside plain numbers.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIdeaMetrics {
    #[serde(default)]
    avg_monthly_searches: Value,
    #[serde(default)]
    competition: Value,
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Google Ads KeywordPlanIdeaService client, scoped to Korean / South Korea
/// and the Google Search network.
pub struct GoogleAdsAdapter {
    client: reqwest::Client,
    api_url: String,
    creds: GoogleCredentials,
    access_token: String,
    pacing: Duration,
}

impl GoogleAdsAdapter {
    /// Exchange the refresh token for a bearer token and return a ready adapter.
    /// The token lives only as long as the adapter (one pipeline call).
    pub async fn connect(
        client: reqwest::Client,
        api_url: &str,
        token_url: &str,
        creds: GoogleCredentials,
    ) -> Result<Self> {
        let access_token = exchange_refresh_token(&client, token_url, &creds)
            .await
            .map_err(|e| AppError::provider(PROVIDER, "token exchange", e))?;
        debug!("google oauth token acquired");

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            creds,
            access_token,
            pacing: Duration::from_millis(GOOGLE_BATCH_DELAY_MS),
        })
    }

    fn ideas_url(&self) -> String {
        format!("{}/customers/{}:generateKeywordIdeas", self.api_url, self.creds.customer_id)
    }

    async fn fetch_page(
        &self,
        batch: &[String],
        page_token: Option<&str>,
    ) -> std::result::Result<GenerateKeywordIdeasResponse, ProviderFailure> {
        let body = GenerateKeywordIdeasRequest {
            language: GOOGLE_LANGUAGE_KO,
            geo_target_constants: [GOOGLE_GEO_KR],
            keyword_plan_network: "GOOGLE_SEARCH",
            keyword_seed: KeywordSeed { keywords: batch },
            page_token,
        };

        let mut req = self
            .client
            .post(self.ideas_url())
            .bearer_auth(&self.access_token)
            .header("developer-token", &self.creds.developer_token)
            .json(&body);
        if let Some(login) = &self.creds.login_customer_id {
            req = req.header("login-customer-id", login);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderFailure::Status { status: status.as_u16(), body: text });
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl KeywordProvider for GoogleAdsAdapter {
    type Row = KeywordIdea;

    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn max_batch(&self) -> usize {
        GOOGLE_MAX_KEYWORDS_PER_REQUEST
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }

    async fn fetch_batch(&self, batch: &[String]) -> std::result::Result<Vec<KeywordIdea>, ProviderFailure> {
        let mut ideas = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 1..=MAX_IDEA_PAGES {
            let resp = self.fetch_page(batch, page_token.as_deref()).await?;
            for raw in resp.results {
                ideas.push(parse_idea(raw)?);
            }
            match resp.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => return Ok(ideas),
            }
            if page == MAX_IDEA_PAGES {
                warn!(seeds = batch.len(), "keyword ideas truncated after {MAX_IDEA_PAGES} pages");
            }
        }
        Ok(ideas)
    }
}

async fn exchange_refresh_token(
    client: &reqwest::Client,
    token_url: &str,
    creds: &GoogleCredentials,
) -> std::result::Result<String, ProviderFailure> {
    let params = [
        ("grant_type", "refresh_token"),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
        ("refresh_token", creds.refresh_token.as_str()),
    ];
    let resp = client.post(token_url).form(&params).send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(ProviderFailure::Status { status: status.as_u16(), body: text });
    }
    let token: TokenResponse = serde_json::from_str(&text)?;
    token
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ProviderFailure::Payload("token response has no access_token".to_string()))
}

fn parse_idea(raw: RawKeywordIdea) -> std::result::Result<KeywordIdea, ProviderFailure> {
    let text = raw
        .text
        .ok_or_else(|| ProviderFailure::Payload("keyword idea has no text".to_string()))?;
    let metrics = raw.keyword_idea_metrics.unwrap_or_default();
    Ok(KeywordIdea {
        text,
        avg_monthly_searches: parse_count(&metrics.avg_monthly_searches),
        competition: parse_competition(&metrics.competition),
    })
}

fn parse_count(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn parse_competition(v: &Value) -> Competition {
    match v {
        Value::Number(n) => n.as_i64().map(Competition::from_google_code).unwrap_or_default(),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(code) => Competition::from_google_code(code),
            Err(_) => Competition::from_google_name(s.trim()),
        },
        _ => Competition::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// Standalone mode: every idea as a row, highest volume first.
pub fn standalone_rows(ideas: Vec<KeywordIdea>) -> Vec<NormalizedRow> {
    let mut rows: Vec<NormalizedRow> = ideas
        .into_iter()
        .map(|idea| NormalizedRow::secondary(idea.text, idea.avg_monthly_searches, idea.competition))
        .collect();
    rows.sort_by(|a, b| b.secondary_volume.cmp(&a.secondary_volume));
    rows
}

/// Filtering mode: keep only ideas whose canonical text is a looked-up primary
/// keyword, keyed by canonical form. Expansion ideas are dropped. When several
/// ideas share a canonical form the first one wins.
pub fn filter_matches(ideas: Vec<KeywordIdea>, lookup: &KeywordLookup) -> HashMap<String, SecondaryMetric> {
    let total = ideas.len();
    let mut matches = HashMap::new();
    for idea in ideas {
        let Some(key) = lookup.resolve(&idea.text) else {
            continue;
        };
        matches.entry(key).or_insert(SecondaryMetric {
            volume: idea.avg_monthly_searches,
            competition: idea.competition,
        });
    }
    info!(ideas = total, matched = matches.len(), "google ideas matched against primary keywords");
    matches
}
