use std::sync::Arc;

use crate::error::Result;
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::index::{FingerprintIndex, ReferenceSet};
use crate::policy::VisualPolicy;

/// 视觉相似度评分 (Visual Similarity Scorer)
///
/// 查询图片的感知指纹分别与真实参考集、AI 参考集比较最近距离：
/// - 离 AI 集更近，且距离小于阈值：偏 AI 的高分
/// - 离真实集更近，且距离小于阈值：偏真实的低分
/// - 其余 (两边都远、距离相等、参考集为空)：中性分
#[derive(Debug, Clone)]
pub struct VisualSimilarityScorer {
    index: Arc<FingerprintIndex>,
    fingerprinter: Fingerprinter,
    policy: VisualPolicy,
}

impl VisualSimilarityScorer {
    pub fn new(index: Arc<FingerprintIndex>, fingerprinter: Fingerprinter, policy: VisualPolicy) -> Self {
        Self {
            index,
            fingerprinter,
            policy,
        }
    }

    /// 原始图片字节 -> 0-100 分
    ///
    /// 只有图片无法解码时返回错误。
    pub fn score(&self, image: &[u8]) -> Result<f64> {
        let query = self.fingerprinter.fingerprint_bytes(image)?;
        Ok(self.score_fingerprint(&query))
    }

    pub fn score_fingerprint(&self, query: &Fingerprint) -> f64 {
        // 空集合视为无穷远
        let min_real = self
            .index
            .nearest_distance(query, ReferenceSet::Real)
            .unwrap_or(u32::MAX);
        let min_ai = self
            .index
            .nearest_distance(query, ReferenceSet::Ai)
            .unwrap_or(u32::MAX);
        let threshold = self.policy.match_threshold;

        if min_ai < min_real && min_ai < threshold {
            self.policy.ai_leaning_score
        } else if min_real < min_ai && min_real < threshold {
            self.policy.real_leaning_score
        } else {
            self.policy.neutral_score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 32 字节指纹，前 `ones` 位置 1
    fn fp_with_ones(ones: usize) -> Fingerprint {
        let mut bytes = vec![0u8; 32];
        for bit in 0..ones {
            bytes[bit / 8] |= 0x80 >> (bit % 8);
        }
        Fingerprint::from_bytes(bytes)
    }

    fn scorer(real: Vec<Fingerprint>, ai: Vec<Fingerprint>) -> VisualSimilarityScorer {
        VisualSimilarityScorer::new(
            Arc::new(FingerprintIndex::new(real, ai)),
            Fingerprinter::default(),
            VisualPolicy::default(),
        )
    }

    #[test]
    fn close_to_ai_reference_leans_ai() {
        let s = scorer(vec![fp_with_ones(40)], vec![fp_with_ones(3)]);
        assert_eq!(s.score_fingerprint(&fp_with_ones(0)), 80.0);
    }

    #[test]
    fn close_to_real_reference_leans_real() {
        let s = scorer(vec![fp_with_ones(9)], vec![fp_with_ones(30)]);
        assert_eq!(s.score_fingerprint(&fp_with_ones(0)), 10.0);
    }

    #[test]
    fn threshold_is_strict() {
        let s = scorer(vec![fp_with_ones(40)], vec![fp_with_ones(10)]);
        assert_eq!(s.score_fingerprint(&fp_with_ones(0)), 50.0);
    }

    #[test]
    fn equidistant_match_is_inconclusive() {
        // 同样 2 位距离，但位置不同
        let real = Fingerprint::from_bytes({
            let mut b = vec![0u8; 32];
            b[0] = 0b1100_0000;
            b
        });
        let ai = Fingerprint::from_bytes({
            let mut b = vec![0u8; 32];
            b[31] = 0b0000_0011;
            b
        });
        let s = scorer(vec![real], vec![ai]);
        assert_eq!(s.score_fingerprint(&fp_with_ones(0)), 50.0);
    }

    #[test]
    fn both_far_is_inconclusive() {
        let s = scorer(vec![fp_with_ones(100)], vec![fp_with_ones(200)]);
        assert_eq!(s.score_fingerprint(&fp_with_ones(0)), 50.0);
    }

    #[test]
    fn empty_reference_sets_degrade_to_neutral() {
        let s = scorer(Vec::new(), Vec::new());
        assert_eq!(s.score_fingerprint(&fp_with_ones(0)), 50.0);
    }

    #[test]
    fn one_empty_set_still_allows_a_match() {
        let s = scorer(Vec::new(), vec![fp_with_ones(1)]);
        assert_eq!(s.score_fingerprint(&fp_with_ones(0)), 80.0);
    }
}
