use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::evidence::{Confidence, EvidenceResult};
use crate::fingerprint::{sha256_hex, Fingerprinter};
use crate::fusion::{self, FusionInput, ScoreBreakdown, Verdict};
use crate::index::FingerprintIndex;
use crate::metadata;
use crate::metadata_score;
use crate::model_client::ModelScorer;
use crate::policy::{MetadataPolicy, ScoringPolicy};
use crate::visual::VisualSimilarityScorer;

/// 一次扫描的完整报告
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub final_score: u8,
    pub verdict: Verdict,
    pub breakdown: ScoreBreakdown,
    pub evidence: Vec<String>,
    pub confidence: Confidence,
    pub sha256: String,
    pub scanned_at: DateTime<Utc>,
}

/// 检测编排器 (Detection Orchestrator)
///
/// 只持有只读的共享状态 (参考指纹索引、模型客户端、策略表)，
/// 单次请求内三路信号并发计算，汇合后融合。
pub struct Detector {
    visual: VisualSimilarityScorer,
    model: Arc<dyn ModelScorer>,
    policy: ScoringPolicy,
}

impl Detector {
    pub fn new(
        index: Arc<FingerprintIndex>,
        fingerprinter: Fingerprinter,
        model: Arc<dyn ModelScorer>,
        policy: ScoringPolicy,
    ) -> Self {
        let visual = VisualSimilarityScorer::new(index, fingerprinter, policy.visual.clone());
        Self {
            visual,
            model,
            policy,
        }
    }

    pub async fn detect(&self, image: Arc<[u8]>, content_type: &str) -> Result<DetectionReport> {
        let sha256 = sha256_hex(&image);

        // 元数据和感知哈希都是 CPU 密集型，放到 blocking 线程池
        let meta_task = {
            let image = Arc::clone(&image);
            let policy = self.policy.metadata.clone();
            tokio::task::spawn_blocking(move || analyze_metadata(&image, &policy))
        };
        let visual_task = {
            let image = Arc::clone(&image);
            let visual = self.visual.clone();
            tokio::task::spawn_blocking(move || visual.score(&image))
        };
        let model_call = self.model.score(Arc::clone(&image), content_type);

        let (meta, web, model) = tokio::join!(meta_task, visual_task, model_call);
        let meta = meta?;
        let web = web??;
        let model = model?;

        let fused = fusion::fuse(
            &FusionInput {
                model_score: model,
                meta_score: f64::from(meta.score),
                web_score: web,
                override_verdict: meta.override_verdict,
            },
            &self.policy.fusion,
        );

        info!(
            sha256 = %sha256,
            model = fused.breakdown.model,
            metadata = fused.breakdown.metadata,
            web = fused.breakdown.web,
            final_score = fused.final_score,
            "🧾 扫描完成: {}",
            fused.verdict
        );

        Ok(DetectionReport {
            final_score: fused.final_score,
            verdict: fused.verdict,
            breakdown: fused.breakdown,
            evidence: meta.evidence,
            confidence: meta.confidence,
            sha256,
            scanned_at: Utc::now(),
        })
    }
}

/// 提取 + 评分；提取失败换成兜底结果，保证这一路永不失败
pub fn analyze_metadata(image: &[u8], policy: &MetadataPolicy) -> EvidenceResult {
    match metadata::extract(image) {
        Ok(tags) => metadata_score::analyze(&tags, policy),
        Err(e) => {
            warn!("⚠️ 元数据提取失败: {}", e);
            EvidenceResult::extraction_failed(policy)
        }
    }
}
