use serde::{Deserialize, Serialize};

use crate::policy::MetadataPolicy;

/// 元数据可信度标签，仅用于展示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_score(score: u8, policy: &MetadataPolicy) -> Self {
        if score > policy.high_confidence_above {
            Confidence::High
        } else if score > policy.medium_confidence_above {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// 元数据分析结果 (Evidence Result)
///
/// 每个请求生成一次，生成后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceResult {
    // 0-100 的整数分
    pub score: u8,

    // 密码学溯源声明有效时为 true，融合阶段直接给出最终判决
    #[serde(rename = "override")]
    pub override_verdict: bool,

    // 规则触发的说明文字，顺序即规则触发顺序，用于前端展示
    pub evidence: Vec<String>,

    pub confidence: Confidence,
}

impl EvidenceResult {
    /// 提取器无法解析元数据时的兜底结果
    ///
    /// 低分、不触发覆盖、只带一条说明。
    pub fn extraction_failed(policy: &MetadataPolicy) -> Self {
        Self {
            score: policy.extraction_failure_score,
            override_verdict: false,
            evidence: vec!["Failed to parse metadata / Stripped".to_string()],
            confidence: Confidence::Low,
        }
    }
}
