pub mod google;
pub mod naver;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderFailure;

pub use google::GoogleAdsAdapter;
pub use naver::NaverAdapter;

/// One keyword-statistics upstream that is queried in fixed-size batches.
#[async_trait]
pub trait KeywordProvider: Send + Sync {
    type Row: Send;

    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Max keywords the provider accepts in a single call.
    fn max_batch(&self) -> usize;

    /// Flat pause between consecutive batch calls.
    fn pacing(&self) -> Duration;

    async fn fetch_batch(&self, batch: &[String]) -> Result<Vec<Self::Row>, ProviderFailure>;
}
