use thiserror::Error;

/// 服务内部的错误类型
///
/// 评分函数本身是全函数 (total)，这里只覆盖真正会失败的外围环节：
/// 配置、图片解码、文件 IO、指纹缓存、外部模型调用、后台任务。
#[derive(Debug, Error)]
pub enum Error {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("图片解码失败: {0}")]
    Image(#[from] image::ImageError),

    #[error("文件 IO 失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("指纹缓存不可用: {0}")]
    Cache(String),

    #[error("模型服务调用失败: {0}")]
    Model(String),

    #[error("后台任务异常退出: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
