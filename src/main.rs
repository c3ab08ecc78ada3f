use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use provenance_core::api;
use provenance_core::config::Config;
use provenance_core::detector::Detector;
use provenance_core::fingerprint::Fingerprinter;
use provenance_core::index::{FingerprintIndex, ReferenceSources};
use provenance_core::model_client::HttpModelClient;
use provenance_core::policy::ScoringPolicy;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provenance_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ----------------------------------------------------------------
    // 0. 加载配置
    // ----------------------------------------------------------------
    let config = Config::from_env().context("读取配置失败")?;
    info!(
        "⚙️  配置加载完成: Addr={}, Model={}, Cache={}",
        config.addr(),
        config.model_url,
        config.hash_cache_path.display()
    );

    // ----------------------------------------------------------------
    // 1. 预加载参考指纹库 (必须在接收请求之前完成)
    // ----------------------------------------------------------------
    let fingerprinter = Fingerprinter::default();
    let sources = ReferenceSources {
        real_dir: config.reference_real_dir.clone(),
        ai_dir: config.reference_ai_dir.clone(),
        cache_path: config.hash_cache_path.clone(),
    };
    let (index, origin) =
        tokio::task::spawn_blocking(move || FingerprintIndex::preload(&fingerprinter, &sources))
            .await
            .context("参考库预加载任务异常")?;
    info!("🔥 参考库就绪 ({:?}): {} 个指纹", origin, index.len());

    // ----------------------------------------------------------------
    // 2. 组装检测器
    // ----------------------------------------------------------------
    let model = HttpModelClient::new(
        config.model_url.clone(),
        config.model_timeout,
        config.model_score_scale,
    )
    .context("创建模型客户端失败")?;

    let detector = Detector::new(
        Arc::new(index),
        fingerprinter,
        Arc::new(model),
        ScoringPolicy::default(),
    );

    let shared_state = Arc::new(api::AppState {
        detector: Arc::new(detector),
        max_upload_bytes: config.max_upload_bytes,
    });

    // ----------------------------------------------------------------
    // 3. 启动 HTTP 服务
    // ----------------------------------------------------------------
    let app = api::app(shared_state);
    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("无法绑定 {}", config.addr()))?;

    info!("🚀 API 服务已运行在: http://{}", config.addr());
    info!("   - GET  /api/images/health : 健康检查");
    info!("   - POST /api/images/scan   : 上传图片进行检测");

    axum::serve(listener, app).await?;

    Ok(())
}
