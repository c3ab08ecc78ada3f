use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// 模型服务返回分数的单位
///
/// 推理服务输出 softmax 概率 (0-1)；内部统一使用 0-100。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreScale {
    /// 0.0 - 1.0，乘以 100 后使用
    Unit,
    /// 已经是 0 - 100
    Percent,
}

impl ScoreScale {
    /// 转换到内部 0-100 刻度并截断
    pub fn to_percent(self, raw: f64) -> f64 {
        let value = match self {
            ScoreScale::Unit => raw * 100.0,
            ScoreScale::Percent => raw,
        };
        if value.is_finite() {
            value.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

impl FromStr for ScoreScale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unit" | "probability" => Ok(ScoreScale::Unit),
            "percent" | "percentage" => Ok(ScoreScale::Percent),
            other => Err(Error::Config(format!("MODEL_SCORE_SCALE 不支持: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_url: String,
    pub model_timeout: Duration,
    pub model_score_scale: ScoreScale,
    pub reference_real_dir: PathBuf,
    pub reference_ai_dir: PathBuf,
    pub hash_cache_path: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            model_url: "http://127.0.0.1:8000/predict".to_string(),
            model_timeout: Duration::from_secs(30),
            model_score_scale: ScoreScale::Unit,
            reference_real_dir: PathBuf::from("hash-db/real"),
            reference_ai_dir: PathBuf::from("hash-db/ai"),
            hash_cache_path: PathBuf::from("hash_cache.json"),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    /// 从环境变量读取配置，缺省值见 `Default`
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            model_url: env::var("MODEL_URL").unwrap_or(defaults.model_url),
            model_timeout: Duration::from_secs(parse_var(
                "MODEL_TIMEOUT_SECS",
                defaults.model_timeout.as_secs(),
            )?),
            model_score_scale: parse_var("MODEL_SCORE_SCALE", defaults.model_score_scale)?,
            reference_real_dir: env::var("HASH_DB_REAL")
                .map(PathBuf::from)
                .unwrap_or(defaults.reference_real_dir),
            reference_ai_dir: env::var("HASH_DB_AI")
                .map(PathBuf::from)
                .unwrap_or(defaults.reference_ai_dir),
            hash_cache_path: env::var("HASH_CACHE")
                .map(PathBuf::from)
                .unwrap_or(defaults.hash_cache_path),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("{} 格式错误 ({}): {}", key, raw, e))),
        Err(_) => Ok(default),
    }
}
