use crate::evidence::{Confidence, EvidenceResult};
use crate::metadata::MetadataTagSet;
use crate::policy::{MetadataPolicy, GENERATOR_KEYWORDS};

/// 元数据证据评分 (Metadata Evidence Scorer)
///
/// 纯函数，永不失败。规则按固定顺序执行，分数可加减，最后统一截断到 [0, 100]；
/// 证据列表的顺序就是规则触发的顺序。
///
/// 1. C2PA 签名 + 数据哈希均有效：直接返回 100 分并设置 override，后续规则全部跳过
/// 2. DigitalSourceType 声明为算法生成：大额加分
/// 3. 文本中出现生成器 / 厂商关键词：按命中数加分，有上限
/// 4. 相机硬件字段齐全：扣分，分两档
/// 5. EXIF / XMP / IPTC 全部缺失：视为被清洗，适度加分
pub fn analyze(tags: &MetadataTagSet, policy: &MetadataPolicy) -> EvidenceResult {
    if tags.provenance.as_ref().is_some_and(|claim| claim.is_verified()) {
        return EvidenceResult {
            score: 100,
            override_verdict: true,
            evidence: vec!["Cryptographically verified C2PA AI provenance".to_string()],
            confidence: Confidence::High,
        };
    }

    let mut score: i32 = 0;
    let mut evidence = Vec::new();

    if let Some(source) = tags.digital_source_type.as_deref() {
        if source.to_lowercase().contains("algorithmicmedia") {
            score += policy.digital_source_bonus;
            evidence.push(format!("IPTC DigitalSourceType = {}", source_code(source)));
        }
    }

    let haystack = tags.text.to_lowercase();
    let matched = matched_keywords(&haystack);
    if !matched.is_empty() {
        score += keyword_bonus(matched.len(), policy);
        evidence.push(format!("Software traces detected: {}", matched.join(", ")));
    }

    let hardware = tags.camera.count();
    if hardware >= policy.strong_hardware_min_fields {
        score -= policy.strong_hardware_penalty;
        evidence.push("Strong physical camera metadata detected".to_string());
    } else if hardware >= policy.partial_hardware_min_fields {
        score -= policy.partial_hardware_penalty;
        evidence.push("Partial camera metadata detected".to_string());
    }

    if !tags.has_exif && !tags.has_xmp && !tags.has_iptc {
        score += policy.stripped_bonus;
        evidence.push("Metadata appears stripped".to_string());
    }

    // clamp 之后一定落在 u8 范围内
    let score = score.clamp(0, 100) as u8;

    EvidenceResult {
        score,
        override_verdict: false,
        evidence,
        confidence: Confidence::from_score(score, policy),
    }
}

fn matched_keywords(haystack: &str) -> Vec<&'static str> {
    GENERATOR_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| haystack.contains(keyword))
        .collect()
}

/// 命中数成比例加分，封顶
fn keyword_bonus(matches: usize, policy: &MetadataPolicy) -> i32 {
    let raw = i32::try_from(matches)
        .unwrap_or(i32::MAX)
        .saturating_mul(policy.keyword_bonus_each);
    raw.min(policy.keyword_bonus_cap)
}

/// `http://cv.iptc.org/newscodes/digitalsourcetype/trainedAlgorithmicMedia` -> `trainedAlgorithmicMedia`
fn source_code(source: &str) -> &str {
    source.rsplit('/').next().unwrap_or(source)
}
