//! 图片 AI 生成概率检测
//!
//! 三路独立信号融合成一个 0-100 分和判决：
//! 元数据启发式 (`metadata_score`)、参考库感知哈希比对 (`visual`)、
//! 外部分类模型 (`model_client`)。C2PA 密码学溯源声明有效时直接覆盖判决。

pub mod api;
pub mod config;
pub mod detector;
pub mod error;
pub mod evidence;
pub mod fingerprint;
pub mod fusion;
pub mod index;
pub mod metadata;
pub mod metadata_score;
pub mod model_client;
pub mod policy;
pub mod visual;

pub use error::{Error, Result};
