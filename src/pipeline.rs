use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::dispatcher::dispatch;
use crate::error::Result;
use crate::merge::{merge_results, sort_by_total_desc};
use crate::normalize::{clean_keywords, KeywordLookup};
use crate::providers::google::{filter_matches, standalone_rows};
use crate::providers::{GoogleAdsAdapter, NaverAdapter};
use crate::types::{ResultTable, TableKind};

/// Entry point for the keyword aggregation pipeline.
///
/// Holds only read-only state; every call builds its own adapters, batches
/// and rows. Nothing is cached between calls.
#[derive(Clone)]
pub struct KeywordPipeline {
    cfg: Arc<Config>,
    client: reqwest::Client,
}

impl KeywordPipeline {
    pub fn new(cfg: Arc<Config>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .build()?;
        Ok(Self { cfg, client })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Naver volumes for `keywords` (and their related keywords), highest total first.
    pub async fn fetch_primary(&self, keywords: &[String], detail: bool) -> Result<ResultTable> {
        let keywords = clean_keywords(keywords)?;
        let naver = self.naver_adapter(detail)?;

        let mut rows = dispatch(&naver, &keywords).await?;
        sort_by_total_desc(&mut rows);
        info!(keywords = keywords.len(), rows = rows.len(), "naver lookup done");
        Ok(ResultTable::new(TableKind::Primary { detail }, rows))
    }

    /// Google keyword ideas for `keywords`, highest volume first, unfiltered.
    pub async fn fetch_secondary(&self, keywords: &[String]) -> Result<ResultTable> {
        let keywords = clean_keywords(keywords)?;
        let creds = self.cfg.google_credentials()?;
        let google = GoogleAdsAdapter::connect(
            self.client.clone(),
            &self.cfg.google_ads_api_url,
            &self.cfg.google_oauth_token_url,
            creds,
        )
        .await?;

        let ideas = dispatch(&google, &keywords).await?;
        let rows = standalone_rows(ideas);
        info!(keywords = keywords.len(), rows = rows.len(), "google lookup done");
        Ok(ResultTable::new(TableKind::Secondary, rows))
    }

    /// Naver rows extended with Google volumes for the first `lookup_cap` Naver keywords.
    pub async fn fetch_merged(&self, keywords: &[String], detail: bool, lookup_cap: usize) -> Result<ResultTable> {
        let keywords = clean_keywords(keywords)?;
        let naver = self.naver_adapter(detail)?;
        let google_creds = self.cfg.google_credentials()?;

        let mut primary = dispatch(&naver, &keywords).await?;
        sort_by_total_desc(&mut primary);
        if primary.is_empty() {
            info!(keywords = keywords.len(), "naver returned no rows, skipping google");
            return Ok(ResultTable::empty(TableKind::Merged { detail }));
        }

        let lookup = KeywordLookup::new(primary.iter().take(lookup_cap).map(|r| r.keyword.as_str()));
        let matches = if lookup.is_empty() {
            HashMap::new()
        } else {
            let google = GoogleAdsAdapter::connect(
                self.client.clone(),
                &self.cfg.google_ads_api_url,
                &self.cfg.google_oauth_token_url,
                google_creds,
            )
            .await?;
            let ideas = dispatch(&google, lookup.originals()).await?;
            filter_matches(ideas, &lookup)
        };

        info!(
            rows = primary.len(),
            looked_up = lookup.len(),
            matched = matches.len(),
            "merged naver and google results"
        );
        Ok(merge_results(primary, &matches, detail))
    }

    fn naver_adapter(&self, detail: bool) -> Result<NaverAdapter> {
        let creds = self.cfg.naver_credentials()?;
        Ok(NaverAdapter::new(self.client.clone(), &self.cfg.naver_api_url, creds, detail))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Query, State};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::error::AppError;
    use crate::types::{Competition, PLACEHOLDER};

    #[derive(Clone, Default)]
    struct Calls {
        naver: Arc<AtomicUsize>,
        google: Arc<AtomicUsize>,
    }

    async fn keywordstool(
        State(calls): State<Calls>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        calls.naver.fetch_add(1, Ordering::SeqCst);
        if params.get("hintKeywords").map(String::as_str) == Some("없는키워드") {
            return Json(json!({ "keywordList": [] }));
        }
        Json(json!({
            "keywordList": [
                { "relKeyword": "네이버광고", "monthlyPcQcCnt": 40, "monthlyMobileQcCnt": 60, "compIdx": "중간" },
                { "relKeyword": "검색광고", "monthlyPcQcCnt": 100, "monthlyMobileQcCnt": 200, "compIdx": "높음" },
                { "relKeyword": "퍼포먼스 마케팅", "monthlyPcQcCnt": "< 10", "monthlyMobileQcCnt": 30, "compIdx": "낮음" }
            ]
        }))
    }

    async fn token() -> Json<Value> {
        Json(json!({ "access_token": "tok" }))
    }

    async fn ideas(State(calls): State<Calls>) -> Json<Value> {
        calls.google.fetch_add(1, Ordering::SeqCst);
        Json(json!({
            "results": [
                { "text": "네이버 광고", "keywordIdeaMetrics": { "avgMonthlySearches": "720", "competition": "MEDIUM" } },
                { "text": "퍼포먼스마케팅", "keywordIdeaMetrics": { "avgMonthlySearches": "90", "competition": 2 } },
                { "text": "마케팅대행", "keywordIdeaMetrics": { "avgMonthlySearches": "9900", "competition": "HIGH" } }
            ]
        }))
    }

    async fn stub_config() -> (Config, Calls) {
        let calls = Calls::default();
        let app = Router::new()
            .route("/keywordstool", get(keywordstool))
            .route("/token", post(token))
            .route("/customers/:target", post(ideas))
            .with_state(calls.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let base = format!("http://{addr}");
        let cfg = Config {
            naver_api_url: base.clone(),
            google_ads_api_url: base.clone(),
            google_oauth_token_url: format!("{base}/token"),
            ..full_credentials()
        };
        (cfg, calls)
    }

    fn full_credentials() -> Config {
        Config {
            // Nothing listens here; reaching the network would surface as a provider error.
            naver_api_url: "http://127.0.0.1:9".to_string(),
            google_ads_api_url: "http://127.0.0.1:9".to_string(),
            google_oauth_token_url: "http://127.0.0.1:9/token".to_string(),
            naver_api_key: Some("key".to_string()),
            naver_customer_id: Some("1234".to_string()),
            naver_secret_key: Some("secret".to_string()),
            google_customer_id: Some("123-456-7890".to_string()),
            google_developer_token: Some("dev".to_string()),
            google_client_id: Some("cid".to_string()),
            google_client_secret: Some("csecret".to_string()),
            google_refresh_token: Some("refresh".to_string()),
            ..Config::default()
        }
    }

    fn pipeline(cfg: Config) -> KeywordPipeline {
        KeywordPipeline::new(Arc::new(cfg)).unwrap()
    }

    fn kws(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_keywords_fail_validation_before_network() {
        let p = pipeline(full_credentials());
        for result in [
            p.fetch_primary(&kws(&["  ", ""]), true).await,
            p.fetch_secondary(&[]).await,
            p.fetch_merged(&kws(&[" "]), true, 100).await,
        ] {
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn missing_primary_credential_is_named() {
        let cfg = Config { naver_customer_id: None, ..full_credentials() };
        let err = pipeline(cfg).fetch_primary(&kws(&["검색광고"]), true).await.unwrap_err();
        match err {
            AppError::Config(msg) => assert!(msg.contains("NAVER_AD_CUSTOMER_ID"), "{msg}"),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn merged_lookup_checks_google_credentials_first() {
        let (cfg, calls) = stub_config().await;
        let cfg = Config { google_developer_token: None, ..cfg };
        let err = pipeline(cfg).fetch_merged(&kws(&["검색광고"]), true, 100).await.unwrap_err();
        assert!(matches!(err, AppError::Config(ref m) if m.contains("GOOGLE_ADS_DEVELOPER_TOKEN")), "{err:?}");
        assert_eq!(calls.naver.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreachable_provider_is_provider_error() {
        let err = pipeline(full_credentials())
            .fetch_primary(&kws(&["검색광고"]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Provider { provider: "naver", .. }), "{err:?}");
    }

    #[tokio::test]
    async fn primary_table_is_sorted_by_total() {
        let (cfg, _) = stub_config().await;
        let table = pipeline(cfg).fetch_primary(&kws(&["검색광고"]), true).await.unwrap();
        assert_eq!(table.kind, TableKind::Primary { detail: true });
        let totals: Vec<u64> = table.rows.iter().map(|r| r.total_volume).collect();
        assert_eq!(totals, vec![300, 100, 35]);
    }

    #[tokio::test]
    async fn merged_table_joins_on_canonical_keyword() {
        let (cfg, calls) = stub_config().await;
        let table = pipeline(cfg)
            .fetch_merged(&kws(&["검색광고", "네이버광고"]), true, 100)
            .await
            .unwrap();

        assert_eq!(table.len(), 3);
        let first = &table.rows[0];
        assert_eq!(first.keyword, "검색광고");
        assert_eq!(first.total_volume, 300);
        assert_eq!(first.secondary_volume, 0);
        assert_eq!(first.secondary_competition.label(), PLACEHOLDER);

        let second = &table.rows[1];
        assert_eq!(second.keyword, "네이버광고");
        assert_eq!(second.secondary_volume, 720);
        assert_eq!(second.secondary_competition, Competition::Medium);

        let third = &table.rows[2];
        assert_eq!(third.keyword, "퍼포먼스 마케팅");
        assert_eq!(third.secondary_volume, 90);
        assert_eq!(third.secondary_competition, Competition::Low);

        assert!(table.rows.iter().all(|r| r.keyword != "마케팅대행"));
        assert_eq!(calls.google.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn lookup_cap_limits_google_seeds() {
        let (cfg, calls) = stub_config().await;
        let table = pipeline(cfg).fetch_merged(&kws(&["검색광고"]), false, 1).await.unwrap();
        // Only "검색광고" was looked up; the other rows stay unmatched.
        assert!(table.rows[1..].iter().all(|r| r.secondary_volume == 0));
        assert_eq!(calls.google.load(Ordering::SeqCst), 1);

        let (cfg, calls) = stub_config().await;
        let table = pipeline(cfg).fetch_merged(&kws(&["검색광고"]), false, 0).await.unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(calls.google.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_primary_result_skips_google() {
        let (cfg, calls) = stub_config().await;
        let table = pipeline(cfg).fetch_merged(&kws(&["없는키워드"]), true, 100).await.unwrap();
        assert!(table.is_empty());
        assert_eq!(calls.naver.load(Ordering::SeqCst), 1);
        assert_eq!(calls.google.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn secondary_standalone_keeps_expansions() {
        let (cfg, _) = stub_config().await;
        let table = pipeline(cfg).fetch_secondary(&kws(&["마케팅"])).await.unwrap();
        assert_eq!(table.kind, TableKind::Secondary);
        let order: Vec<_> = table.rows.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(order, vec!["마케팅대행", "네이버 광고", "퍼포먼스마케팅"]);
    }
}
