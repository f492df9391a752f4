use super::model::ApiEnvelope;
use super::AuctionSource;
use crate::config;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::{AuctionRecord, PageRequest};
use crate::transform;
use crate::utils;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Local;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
    service_key: Arc<str>,
}

impl ApiClient {
    pub fn new<S: Into<String>>(service_key: S) -> AppResult<Self> {
        Self::with_base_url(service_key, config::BASE_API_URL)
    }

    pub fn with_base_url<S: Into<String>>(service_key: S, base_url: &str) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config::HTTP_TIMEOUT_SECONDS))
            .connect_timeout(Duration::from_secs(config::HTTP_CONNECT_TIMEOUT))
            .build()
            .map_err(AppError::from)?;
        Ok(ApiClient {
            client,
            endpoint: format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                config::PUBLIC_SALE_OPERATION
            ),
            service_key: Arc::from(service_key.into()),
        })
    }

    async fn query(
        &self,
        disposal_method: &str,
        page_no: u32,
        num_rows: u32,
    ) -> AppResult<ApiEnvelope> {
        let begin_date = utils::days_ago_stamp(Local::now(), config::WINDOW_DAYS);
        let params = [
            ("serviceKey", self.service_key.to_string()),
            ("numOfRows", num_rows.to_string()),
            ("pageNo", page_no.to_string()),
            ("DPSL_MTD_CD", disposal_method.to_string()),
            ("PBCT_BEGN_DTM", begin_date),
        ];
        let log_prefix = format!(
            "API Req {} [{}] page {}",
            config::PUBLIC_SALE_OPERATION,
            disposal_method,
            page_no
        );

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(AppError::from)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(AppError::Transport(format!(
                "{} - HTTP {} ({}). Body: {}...",
                log_prefix,
                status,
                status.canonical_reason().unwrap_or("Unknown Status"),
                body.chars().take(150).collect::<String>()
            )));
        }

        let bytes: Bytes = resp.bytes().await.map_err(AppError::from)?;

        let envelope = ApiEnvelope::parse(&bytes).map_err(|e| {
            let snippet_len = bytes.len().min(200);
            log(
                LogLevel::Error,
                &format!(
                    "{} - Fail parse response: {}. Snippet: '{}'",
                    log_prefix,
                    e,
                    String::from_utf8_lossy(&bytes[..snippet_len])
                ),
            );
            e
        })?;

        envelope.ensure_success()
    }
}

#[async_trait]
impl AuctionSource for ApiClient {
    async fn fetch_total_count(&self, disposal_method: &str) -> AppResult<u64> {
        self.query(disposal_method, 1, 1).await?.total_count()
    }

    async fn fetch_page(&self, request: &PageRequest) -> AppResult<Vec<AuctionRecord>> {
        let envelope = self
            .query(&request.disposal_method, request.page_no, request.page_size)
            .await?;
        Ok(envelope.items.iter().map(transform::map_record).collect())
    }
}
