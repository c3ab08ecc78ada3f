/// 评分策略表
///
/// 所有启发式常量集中在这里：元数据加减分、视觉相似阈值、融合权重、判决分档。
/// 分数统一使用 0-100 刻度。
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPolicy {
    pub metadata: MetadataPolicy,
    pub visual: VisualPolicy,
    pub fusion: FusionPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataPolicy {
    /// DigitalSourceType 声明为算法生成
    pub digital_source_bonus: i32,
    /// 每命中一个生成器关键词的加分
    pub keyword_bonus_each: i32,
    /// 关键词加分上限
    pub keyword_bonus_cap: i32,
    /// 硬件字段 >= 4 个
    pub strong_hardware_penalty: i32,
    pub strong_hardware_min_fields: usize,
    /// 硬件字段 >= 2 个
    pub partial_hardware_penalty: i32,
    pub partial_hardware_min_fields: usize,
    /// EXIF / XMP / IPTC 全部缺失
    pub stripped_bonus: i32,
    /// 元数据提取失败时的兜底分
    pub extraction_failure_score: u8,
    pub high_confidence_above: u8,
    pub medium_confidence_above: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualPolicy {
    /// 汉明距离严格小于该值才算“足够接近”
    pub match_threshold: u32,
    pub ai_leaning_score: f64,
    pub real_leaning_score: f64,
    pub neutral_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FusionPolicy {
    /// 权重以整数百分比表示，三者之和为 100
    pub model_weight: u32,
    pub metadata_weight: u32,
    pub web_weight: u32,
    /// 判决分档，均为严格大于
    pub high_probability_above: u8,
    pub suspicious_above: u8,
    pub likely_real_above: u8,
}

impl FusionPolicy {
    pub fn total_weight(&self) -> u32 {
        self.model_weight + self.metadata_weight + self.web_weight
    }
}

impl Default for MetadataPolicy {
    fn default() -> Self {
        Self {
            digital_source_bonus: 70,
            keyword_bonus_each: 20,
            keyword_bonus_cap: 60,
            strong_hardware_penalty: 50,
            strong_hardware_min_fields: 4,
            partial_hardware_penalty: 25,
            partial_hardware_min_fields: 2,
            stripped_bonus: 20,
            extraction_failure_score: 20,
            high_confidence_above: 85,
            medium_confidence_above: 50,
        }
    }
}

impl Default for VisualPolicy {
    fn default() -> Self {
        Self {
            match_threshold: 10,
            ai_leaning_score: 80.0,
            real_leaning_score: 10.0,
            neutral_score: 50.0,
        }
    }
}

impl Default for FusionPolicy {
    fn default() -> Self {
        Self {
            model_weight: 55,
            metadata_weight: 30,
            web_weight: 15,
            high_probability_above: 85,
            suspicious_above: 50,
            likely_real_above: 20,
        }
    }
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            metadata: MetadataPolicy::default(),
            visual: VisualPolicy::default(),
            fusion: FusionPolicy::default(),
        }
    }
}

/// 生成器 / 厂商关键词，在小写后的元数据文本中做子串匹配
pub const GENERATOR_KEYWORDS: &[&str] = &[
    "dalle",
    "midjourney",
    "stablediffusion",
    "sdxl",
    "openai",
    "firefly",
    "gemini",
    "synthetic",
    "generative",
    "chatgpt",
];
