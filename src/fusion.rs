use serde::{Deserialize, Serialize};

use crate::policy::FusionPolicy;

/// 最终判决标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "Definite AI (cryptographically verified)")]
    DefiniteAi,
    #[serde(rename = "High Probability AI")]
    HighProbabilityAi,
    #[serde(rename = "Suspicious / Likely AI")]
    SuspiciousLikelyAi,
    #[serde(rename = "Likely Real")]
    LikelyReal,
    #[serde(rename = "Real Image")]
    RealImage,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::DefiniteAi => "Definite AI (cryptographically verified)",
            Verdict::HighProbabilityAi => "High Probability AI",
            Verdict::SuspiciousLikelyAi => "Suspicious / Likely AI",
            Verdict::LikelyReal => "Likely Real",
            Verdict::RealImage => "Real Image",
        }
    }

    /// 分档从高到低判断，边界值归入较低一档
    pub fn from_score(score: u8, policy: &FusionPolicy) -> Self {
        if score > policy.high_probability_above {
            Verdict::HighProbabilityAi
        } else if score > policy.suspicious_above {
            Verdict::SuspiciousLikelyAi
        } else if score > policy.likely_real_above {
            Verdict::LikelyReal
        } else {
            Verdict::RealImage
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 融合输入，三个信号都在 0-100 刻度上
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionInput {
    pub model_score: f64,
    pub meta_score: f64,
    pub web_score: f64,
    pub override_verdict: bool,
}

/// 各信号四舍五入后的原值，仅用于展示，不参与加权
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub model: u8,
    pub metadata: u8,
    pub web: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusionResult {
    pub final_score: u8,
    pub verdict: Verdict,
    pub breakdown: ScoreBreakdown,
}

/// 融合三路信号
///
/// 纯函数：override 为真时直接给出满分和“密码学确证”判决；
/// 否则按整数百分比权重加权，只在最后除一次权重和再四舍五入，
/// 整数输入 (如 90/80/80 -> 85.5) 不会引入浮点误差。
pub fn fuse(input: &FusionInput, policy: &FusionPolicy) -> FusionResult {
    let model = sanitize(input.model_score);
    let meta = sanitize(input.meta_score);
    let web = sanitize(input.web_score);

    let breakdown = ScoreBreakdown {
        model: to_percent(model),
        metadata: to_percent(meta),
        web: to_percent(web),
    };

    if input.override_verdict {
        return FusionResult {
            final_score: 100,
            verdict: Verdict::DefiniteAi,
            breakdown,
        };
    }

    let weighted = model * f64::from(policy.model_weight)
        + meta * f64::from(policy.metadata_weight)
        + web * f64::from(policy.web_weight);
    let total = f64::from(policy.total_weight().max(1));
    let final_score = to_percent(weighted / total);

    FusionResult {
        final_score,
        verdict: Verdict::from_score(final_score, policy),
        breakdown,
    }
}

/// 非有限值按 0 处理，并截断到 [0, 100]
fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// 四舍五入 (远离零) 到 0-100 整数
fn to_percent(value: f64) -> u8 {
    sanitize(value).round() as u8
}
