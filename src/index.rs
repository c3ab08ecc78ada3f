use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fingerprint::{Fingerprint, Fingerprinter};

/// 参考库扫描时接受的扩展名
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// 参考集类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSet {
    Real,
    Ai,
}

/// 参考库位置：两类图片目录 + 指纹缓存文件
#[derive(Debug, Clone)]
pub struct ReferenceSources {
    pub real_dir: PathBuf,
    pub ai_dir: PathBuf,
    pub cache_path: PathBuf,
}

/// 本次索引来自哪条路径
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadOrigin {
    /// 命中缓存，没有扫描目录
    Cache,
    /// 扫描目录并重新计算
    Scanned,
}

/// 缓存文件格式: `{ "real": [hex...], "ai": [hex...] }`
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    real: Vec<Fingerprint>,
    ai: Vec<Fingerprint>,
}

/// 参考指纹索引 (Fingerprint Index)
///
/// 启动时构建一次，之后只读，可被任意多个请求并发查询，不需要加锁。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintIndex {
    real: Vec<Fingerprint>,
    ai: Vec<Fingerprint>,
}

impl FingerprintIndex {
    pub fn new(real: Vec<Fingerprint>, ai: Vec<Fingerprint>) -> Self {
        Self { real, ai }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn set(&self, set: ReferenceSet) -> &[Fingerprint] {
        match set {
            ReferenceSet::Real => &self.real,
            ReferenceSet::Ai => &self.ai,
        }
    }

    pub fn len(&self) -> usize {
        self.real.len() + self.ai.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 与指定集合中所有指纹的最小汉明距离；集合为空时返回 `None` (视为无穷远)
    pub fn nearest_distance(&self, query: &Fingerprint, set: ReferenceSet) -> Option<u32> {
        self.set(set).iter().map(|fp| query.distance(fp)).min()
    }

    /// 预加载参考库
    ///
    /// 优先读取缓存；缓存不存在或不可用时扫描两个目录逐张计算，
    /// 然后写回缓存，下次启动直接走缓存。
    /// 单张图片失败只记日志跳过，整个过程不会失败。
    pub fn preload(fingerprinter: &Fingerprinter, sources: &ReferenceSources) -> (Self, PreloadOrigin) {
        match Self::load_cache(&sources.cache_path, fingerprinter.bit_len()) {
            Ok(Some(index)) => {
                info!(
                    "⚡ 命中指纹缓存 {}: real={}, ai={}",
                    sources.cache_path.display(),
                    index.real.len(),
                    index.ai.len()
                );
                return (index, PreloadOrigin::Cache);
            }
            Ok(None) => info!("🐢 未找到指纹缓存，开始扫描参考库 (仅首次)"),
            Err(e) => warn!("⚠️ 指纹缓存不可用，重新扫描: {}", e),
        }

        let index = Self::new(
            scan_directory(fingerprinter, &sources.real_dir),
            scan_directory(fingerprinter, &sources.ai_dir),
        );
        info!(
            "✅ 参考库扫描完成: real={}, ai={}",
            index.real.len(),
            index.ai.len()
        );

        match index.save_cache(&sources.cache_path) {
            Ok(()) => info!("💾 指纹缓存已写入 {}", sources.cache_path.display()),
            Err(e) => warn!("⚠️ 指纹缓存写入失败，下次启动将重新扫描: {}", e),
        }

        (index, PreloadOrigin::Scanned)
    }

    /// `Ok(None)` 表示缓存文件不存在
    fn load_cache(path: &Path, bit_len: usize) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read(path)?;
        let cache: CacheFile =
            serde_json::from_slice(&raw).map_err(|e| Error::Cache(e.to_string()))?;

        let mismatched = cache
            .real
            .iter()
            .chain(cache.ai.iter())
            .find(|fp| fp.bit_len() != bit_len);
        if let Some(fp) = mismatched {
            return Err(Error::Cache(format!(
                "指纹位数不一致: 期望 {}, 实际 {}",
                bit_len,
                fp.bit_len()
            )));
        }

        Ok(Some(Self::new(cache.real, cache.ai)))
    }

    /// 先写临时文件再 rename，避免写一半的缓存被下次启动读到
    fn save_cache(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let cache = CacheFile {
            real: self.real.clone(),
            ai: self.ai.clone(),
        };
        let payload = serde_json::to_vec(&cache).map_err(|e| Error::Cache(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// 扫描单个目录 (不递归，按文件名排序)
fn scan_directory(fingerprinter: &Fingerprinter, dir: &Path) -> Vec<Fingerprint> {
    if !dir.is_dir() {
        warn!("⚠️ 参考目录不存在: {}", dir.display());
        return Vec::new();
    }

    let mut fingerprints = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("❌ 读取目录项失败: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !is_image(path) {
            continue;
        }
        match fingerprinter.fingerprint_file(path) {
            Ok(fp) => fingerprints.push(fp),
            Err(e) => warn!("❌ 计算指纹失败，已跳过 {}: {}", path.display(), e),
        }
    }
    fingerprints
}
