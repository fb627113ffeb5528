use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::{
    NaverCredentials, NAVER_BATCH_DELAY_MS, NAVER_KEYWORD_TOOL_URI, NAVER_MAX_KEYWORDS_PER_REQUEST,
};
use crate::error::ProviderFailure;
use crate::providers::KeywordProvider;
use crate::signer;
use crate::types::{Competition, DetailMetrics, NormalizedRow};

/// Everything outside RFC 3986 "unreserved" is escaped, except the comma:
/// the keyword tool only splits `hintKeywords` on literal commas.
const HINT_KEYWORDS: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b',');

/// Value the tool reports as "< 10" is read as this lower-bound estimate.
pub const FLOOR_VOLUME_ESTIMATE: u64 = 5;

#[derive(Debug, Deserialize)]
struct KeywordToolResponse {
    #[serde(rename = "keywordList")]
    keyword_list: Option<Vec<RawKeywordItem>>,
}

/// One `keywordList` entry as the tool sends it. Metrics are kept as raw JSON
/// values because counts come back either as numbers or as strings like "< 10".
#[derive(Debug, Deserialize)]
pub struct RawKeywordItem {
    #[serde(rename = "relKeyword")]
    pub rel_keyword: Option<String>,
    #[serde(rename = "monthlyPcQcCnt", default)]
    pub monthly_pc_qc_cnt: Value,
    #[serde(rename = "monthlyMobileQcCnt", default)]
    pub monthly_mobile_qc_cnt: Value,
    #[serde(rename = "monthlyAvePcClkCnt", default)]
    pub monthly_ave_pc_clk_cnt: Value,
    #[serde(rename = "monthlyAveMobileClkCnt", default)]
    pub monthly_ave_mobile_clk_cnt: Value,
    #[serde(rename = "monthlyAvePcCtr", default)]
    pub monthly_ave_pc_ctr: Value,
    #[serde(rename = "monthlyAveMobileCtr", default)]
    pub monthly_ave_mobile_ctr: Value,
    #[serde(rename = "plAvgDepth", default)]
    pub pl_avg_depth: Value,
    #[serde(rename = "compIdx", default)]
    pub comp_idx: Option<String>,
}

/// Naver Search Ad keyword tool client.
pub struct NaverAdapter {
    client: reqwest::Client,
    base_url: String,
    creds: NaverCredentials,
    detail: bool,
    pacing: Duration,
}

impl NaverAdapter {
    pub fn new(client: reqwest::Client, base_url: &str, creds: NaverCredentials, detail: bool) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            creds,
            detail,
            pacing: Duration::from_millis(NAVER_BATCH_DELAY_MS),
        }
    }

    fn batch_url(&self, batch: &[String]) -> String {
        format!(
            "{}{}?hintKeywords={}&showDetail={}",
            self.base_url,
            NAVER_KEYWORD_TOOL_URI,
            hint_keywords_param(batch),
            if self.detail { 1 } else { 0 },
        )
    }
}

#[async_trait]
impl KeywordProvider for NaverAdapter {
    type Row = NormalizedRow;

    fn name(&self) -> &'static str {
        "naver"
    }

    fn max_batch(&self) -> usize {
        NAVER_MAX_KEYWORDS_PER_REQUEST
    }

    fn pacing(&self) -> Duration {
        self.pacing
    }

    async fn fetch_batch(&self, batch: &[String]) -> Result<Vec<NormalizedRow>, ProviderFailure> {
        let url = self.batch_url(batch);
        let headers = signer::auth_headers(&self.creds, "GET", NAVER_KEYWORD_TOOL_URI)
            .map_err(|e| ProviderFailure::Request(e.to_string()))?;

        debug!(url = %url, "naver keywordstool request");
        let resp = self.client.get(&url).headers(headers).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ProviderFailure::Status { status: status.as_u16(), body });
        }

        parse_keyword_list(&body, self.detail)
    }
}

/// `hintKeywords` value: whitespace stripped from each keyword, joined by literal commas.
pub fn hint_keywords_param(batch: &[String]) -> String {
    let joined = batch
        .iter()
        .map(|kw| kw.chars().filter(|c| !c.is_whitespace()).collect::<String>())
        .collect::<Vec<_>>()
        .join(",");
    utf8_percent_encode(&joined, HINT_KEYWORDS).to_string()
}

pub fn parse_keyword_list(body: &str, detail: bool) -> Result<Vec<NormalizedRow>, ProviderFailure> {
    let resp: KeywordToolResponse = serde_json::from_str(body)?;
    let items = resp
        .keyword_list
        .ok_or_else(|| ProviderFailure::Payload("response has no keywordList".to_string()))?;

    items.into_iter().map(|item| normalize_item(item, detail)).collect()
}

fn normalize_item(item: RawKeywordItem, detail: bool) -> Result<NormalizedRow, ProviderFailure> {
    let keyword = item
        .rel_keyword
        .ok_or_else(|| ProviderFailure::Payload("keywordList item has no relKeyword".to_string()))?;

    let mut row = NormalizedRow::primary(
        keyword,
        to_volume(&item.monthly_pc_qc_cnt),
        to_volume(&item.monthly_mobile_qc_cnt),
    );
    if detail {
        row.competition = item
            .comp_idx
            .as_deref()
            .map(Competition::from_naver_label)
            .unwrap_or_default();
        row.detail = Some(DetailMetrics {
            pc_avg_clicks: to_metric(&item.monthly_ave_pc_clk_cnt),
            mobile_avg_clicks: to_metric(&item.monthly_ave_mobile_clk_cnt),
            pc_ctr: to_metric(&item.monthly_ave_pc_ctr),
            mobile_ctr: to_metric(&item.monthly_ave_mobile_ctr),
            avg_ad_depth: to_metric(&item.pl_avg_depth),
        });
    }
    Ok(row)
}

/// Monthly search count. "< 10" style strings become `FLOOR_VOLUME_ESTIMATE`,
/// anything unparseable becomes 0.
pub fn to_volume(v: &Value) -> u64 {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) if s.starts_with('<') => FLOOR_VOLUME_ESTIMATE,
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

fn to_metric(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, RawQuery, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;
    use crate::dispatcher::dispatch;

    #[test]
    fn floor_strings_read_as_five() {
        for s in ["< 10", "<10", "< 100", "<"] {
            assert_eq!(to_volume(&json!(s)), FLOOR_VOLUME_ESTIMATE, "{s}");
        }
    }

    #[test]
    fn unparseable_volumes_read_as_zero() {
        for v in [json!("n/a"), json!(""), json!(null), json!(true), json!([1]), json!(-3)] {
            assert_eq!(to_volume(&v), 0, "{v}");
        }
        assert_eq!(to_volume(&json!(1200)), 1200);
        assert_eq!(to_volume(&json!("340")), 340);
        assert_eq!(to_volume(&json!(12.7)), 12);
    }

    #[test]
    fn hint_keywords_keep_literal_commas() {
        let batch = vec!["검색광고".to_string(), "naver ad".to_string(), "a&b".to_string()];
        assert_eq!(
            hint_keywords_param(&batch),
            "%EA%B2%80%EC%83%89%EA%B4%91%EA%B3%A0,naverad,a%26b"
        );
    }

    #[test]
    fn detail_rows_carry_extra_metrics() {
        let body = json!({
            "keywordList": [{
                "relKeyword": "검색광고",
                "monthlyPcQcCnt": 100,
                "monthlyMobileQcCnt": "< 10",
                "monthlyAvePcClkCnt": 3.4,
                "monthlyAveMobileClkCnt": "1.5",
                "monthlyAvePcCtr": 2.1,
                "monthlyAveMobileCtr": 0.8,
                "plAvgDepth": 15,
                "compIdx": "높음"
            }]
        })
        .to_string();

        let rows = parse_keyword_list(&body, true).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.total_volume, 105);
        assert_eq!(row.competition, Competition::High);
        let detail = row.detail.as_ref().unwrap();
        assert_eq!(detail.pc_avg_clicks, 3.4);
        assert_eq!(detail.mobile_avg_clicks, 1.5);
        assert_eq!(detail.avg_ad_depth, 15.0);

        let plain = parse_keyword_list(&body, false).unwrap();
        assert!(plain[0].detail.is_none());
        assert_eq!(plain[0].competition, Competition::Unknown);
    }

    #[test]
    fn huge_counts_saturate_the_total() {
        let body = r#"{"keywordList":[{"relKeyword":"x","monthlyPcQcCnt":18446744073709551615,"monthlyMobileQcCnt":1}]}"#;
        let rows = parse_keyword_list(body, false).unwrap();
        assert_eq!(rows[0].pc_volume, u64::MAX);
        assert_eq!(rows[0].mobile_volume, 1);
        assert_eq!(rows[0].total_volume, u64::MAX);
    }

    #[test]
    fn missing_fields_are_rejected_or_defaulted() {
        assert!(matches!(parse_keyword_list("{}", true), Err(ProviderFailure::Payload(_))));
        assert!(matches!(
            parse_keyword_list(r#"{"keywordList":[{"monthlyPcQcCnt":1}]}"#, true),
            Err(ProviderFailure::Payload(_))
        ));
        assert!(matches!(parse_keyword_list("not json", true), Err(ProviderFailure::Payload(_))));

        let rows = parse_keyword_list(r#"{"keywordList":[{"relKeyword":"x"}]}"#, true).unwrap();
        assert_eq!(rows[0].total_volume, 0);
        assert_eq!(rows[0].detail, Some(DetailMetrics::default()));
        assert!(parse_keyword_list(r#"{"keywordList":[]}"#, true).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Against a local stub of the keyword tool
    // -----------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct Seen {
        queries: Arc<Mutex<Vec<String>>>,
    }

    async fn keywordstool(
        State(seen): State<Seen>,
        headers: HeaderMap,
        RawQuery(raw): RawQuery,
        Query(params): Query<HashMap<String, String>>,
    ) -> Result<Json<serde_json::Value>, StatusCode> {
        for h in ["x-timestamp", "x-api-key", "x-customer", "x-signature"] {
            if !headers.contains_key(h) {
                return Err(StatusCode::UNAUTHORIZED);
            }
        }
        seen.queries.lock().unwrap().push(raw.unwrap_or_default());

        let hints = params.get("hintKeywords").cloned().unwrap_or_default();
        if hints.contains("fail") {
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
        let list: Vec<_> = hints
            .split(',')
            .enumerate()
            .map(|(i, kw)| json!({ "relKeyword": kw, "monthlyPcQcCnt": i * 10, "monthlyMobileQcCnt": "< 10" }))
            .collect();
        Ok(Json(json!({ "keywordList": list })))
    }

    async fn stub_server() -> (String, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .route("/keywordstool", get(keywordstool))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}"), seen)
    }

    fn adapter(base_url: &str) -> NaverAdapter {
        let creds = NaverCredentials {
            api_key: "key".to_string(),
            customer_id: "1234".to_string(),
            secret_key: "secret".to_string(),
        };
        let mut adapter = NaverAdapter::new(reqwest::Client::new(), base_url, creds, false);
        adapter.pacing = Duration::from_millis(10);
        adapter
    }

    #[tokio::test]
    async fn batches_hit_the_tool_with_signed_requests() {
        let (url, seen) = stub_server().await;
        let naver = adapter(&url);
        let kws: Vec<String> = (1..=7).map(|i| format!("kw {i}")).collect();

        let rows = dispatch(&naver, &kws).await.unwrap();
        assert_eq!(rows.len(), 7);
        assert_eq!(rows[0].keyword, "kw1");
        assert_eq!(rows[0].total_volume, 5);
        assert_eq!(rows[6].total_volume, 10 + 5);

        let queries = seen.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], "hintKeywords=kw1,kw2,kw3,kw4,kw5&showDetail=0");
        assert_eq!(queries[1], "hintKeywords=kw6,kw7&showDetail=0");
    }

    #[tokio::test]
    async fn http_error_status_is_reported() {
        let (url, _) = stub_server().await;
        let naver = adapter(&url);
        let err = naver.fetch_batch(&["fail".to_string()]).await.unwrap_err();
        assert!(matches!(err, ProviderFailure::Status { status: 429, .. }), "{err:?}");
    }
}
