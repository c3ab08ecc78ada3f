#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::path::Path;
use std::sync::Arc;

use provenance_core::model_client::ModelScorer;
use provenance_core::{Error, Result};

fn encode_png(img: RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageOutputFormat::Png)
        .unwrap();
    buf
}

/// 左黑右白
pub fn left_right_png() -> Vec<u8> {
    encode_png(RgbImage::from_fn(64, 64, |x, _| {
        if x < 32 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    }))
}

/// 上黑下白
pub fn top_bottom_png() -> Vec<u8> {
    encode_png(RgbImage::from_fn(64, 64, |_, y| {
        if y < 32 {
            Rgb([0, 0, 0])
        } else {
            Rgb([255, 255, 255])
        }
    }))
}

pub fn write(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

/// PNG 末尾追加一段带有效性断言的 C2PA 文本
pub fn with_verified_c2pa(mut png: Vec<u8>) -> Vec<u8> {
    png.extend_from_slice(b"\x00\x00jumb\x00c2pa\x00manifest\x00");
    png.extend_from_slice(b"validation: claim signature valid; data hash valid\x00");
    png
}

/// 固定返回一个 0-100 分数的模型
pub struct FixedModel(pub f64);

#[async_trait]
impl ModelScorer for FixedModel {
    async fn score(&self, _image: Arc<[u8]>, _content_type: &str) -> Result<f64> {
        Ok(self.0)
    }
}

pub struct FailingModel;

#[async_trait]
impl ModelScorer for FailingModel {
    async fn score(&self, _image: Arc<[u8]>, _content_type: &str) -> Result<f64> {
        Err(Error::Model("connection refused".to_string()))
    }
}
