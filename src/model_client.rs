use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ScoreScale;
use crate::error::{Error, Result};

/// 外部分类模型
///
/// 返回 0-100 刻度的 AI 分数。
#[async_trait]
pub trait ModelScorer: Send + Sync {
    async fn score(&self, image: Arc<[u8]>, content_type: &str) -> Result<f64>;
}

/// 推理服务的响应，只关心 `ai_score`
#[derive(Debug, Deserialize)]
struct PredictResponse {
    ai_score: f64,
}

/// 通过 HTTP multipart 上传调用推理服务 (`POST /predict`)
pub struct HttpModelClient {
    http_client: reqwest::Client,
    url: String,
    scale: ScoreScale,
}

impl HttpModelClient {
    pub fn new(url: impl Into<String>, timeout: Duration, scale: ScoreScale) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Model(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
            scale,
        })
    }
}

#[async_trait]
impl ModelScorer for HttpModelClient {
    async fn score(&self, image: Arc<[u8]>, content_type: &str) -> Result<f64> {
        let part = Part::bytes(image.to_vec())
            .file_name("upload.jpg")
            .mime_str(content_type)
            .map_err(|e| Error::Model(format!("无效的 content type {}: {}", content_type, e)))?;
        let form = Form::new().part("file", part);

        tracing::debug!(url = %self.url, bytes = image.len(), "调用模型服务");

        let response = self
            .http_client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Model(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let prediction: PredictResponse = response
            .json()
            .await
            .map_err(|e| Error::Model(format!("响应解析失败: {}", e)))?;

        tracing::debug!(ai_score = prediction.ai_score, "模型服务返回");

        Ok(self.scale.to_percent(prediction.ai_score))
    }
}
