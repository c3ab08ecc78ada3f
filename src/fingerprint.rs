use img_hash::image::{self, DynamicImage, ImageFormat, ImageOutputFormat};
use img_hash::{HashAlg, HasherConfig}; // 感知哈希的配置器和算法枚举
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// 哈希网格边长：16x16 = 256 位
pub const HASH_GRID: u32 = 16;

/// 规范化重编码使用的 JPEG 质量
const CANONICAL_JPEG_QUALITY: u8 = 90;

/// 感知指纹 (Perceptual Fingerprint)
///
/// 固定长度的位串，视觉上相似的图片汉明距离小。
/// 序列化为小写十六进制字符串。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn bit_len(&self) -> usize {
        self.0.len() * 8
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        hex::decode(s).map(Self)
    }

    /// 与另一个指纹的汉明距离
    pub fn distance(&self, other: &Fingerprint) -> u32 {
        hamming_distance(&self.0, &other.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}

/// 汉明距离：不同位的个数
///
/// 长度不一致时，多出来的字节按全部不同计。
pub fn hamming_distance(a: &[u8], b: &[u8]) -> u32 {
    let common: u32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum();
    let extra = a.len().abs_diff(b.len()) as u32 * 8;
    common + extra
}

/// 指纹计算器
///
/// 参考集和查询图片必须用同一个配置计算，否则距离比较没有意义。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprinter {
    grid: u32,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self { grid: HASH_GRID }
    }
}

impl Fingerprinter {
    /// 输出位数
    pub fn bit_len(&self) -> usize {
        (self.grid * self.grid) as usize
    }

    fn hasher(&self) -> img_hash::Hasher {
        HasherConfig::new()
            .hash_alg(HashAlg::Blockhash) // blockhash.io 算法，和参考库建库时一致
            .hash_size(self.grid, self.grid)
            .to_hasher()
    }

    /// 原始字节 -> 解码 -> 规范化 -> 感知哈希
    pub fn fingerprint_bytes(&self, bytes: &[u8]) -> Result<Fingerprint> {
        let decoded = image::load_from_memory(bytes)?;
        let canonical = canonicalize(&decoded)?;
        Ok(self.fingerprint_image(&canonical))
    }

    pub fn fingerprint_file(&self, path: &Path) -> Result<Fingerprint> {
        let bytes = fs::read(path)?;
        self.fingerprint_bytes(&bytes)
    }

    /// 对已解码、已规范化的图片直接计算
    pub fn fingerprint_image(&self, img: &DynamicImage) -> Fingerprint {
        let hash = self.hasher().hash_image(img);
        Fingerprint(hash.as_bytes().to_vec())
    }
}

/// 统一成 RGB8 后重编码为 JPEG 再解码
///
/// 上传的 PNG / WebP / JPEG 经过同一条编码路径，消除容器差异。
fn canonicalize(img: &DynamicImage) -> Result<DynamicImage> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut encoded = Vec::new();
    rgb.write_to(&mut encoded, ImageOutputFormat::Jpeg(CANONICAL_JPEG_QUALITY))?;
    Ok(image::load_from_memory_with_format(&encoded, ImageFormat::Jpeg)?)
}

/// 原始字节的 SHA256 (小写十六进制)，用于扫描报告
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
