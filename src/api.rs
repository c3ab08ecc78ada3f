use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::detector::{DetectionReport, Detector};

/// 只接受这几种图片类型
const ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// multipart 边界和字段头的额外空间
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// ==========================================
// 1. 应用状态 (Shared State)
// ==========================================
// Detector 内部全部只读，请求之间不需要加锁。
pub struct AppState {
    pub detector: Arc<Detector>,
    pub max_upload_bytes: usize,
}

// ==========================================
// 2. 路由
// ==========================================
pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;
    let images = Router::new()
        .route("/health", get(health))
        .route("/scan", post(scan))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .nest("/api/images", images)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==========================================
// 3. 处理函数
// ==========================================

async fn health() -> Json<&'static str> {
    Json("All OK")
}

struct Upload {
    bytes: Arc<[u8]>,
    content_type: String,
}

/// 接口：上传图片并返回检测报告
///
/// 内部任何环节失败都只对外返回统一的 "System failure"，细节写日志。
async fn scan(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DetectionReport>, (StatusCode, String)> {
    let upload = read_upload(&mut multipart, state.max_upload_bytes)
        .await?
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "No Image Uploaded".to_string()))?;

    info!(
        "📥 收到扫描请求: type={}, size={} bytes",
        upload.content_type,
        upload.bytes.len()
    );

    state
        .detector
        .detect(upload.bytes, &upload.content_type)
        .await
        .map(Json)
        .map_err(|e| {
            error!("❌ 扫描失败: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "System failure".to_string())
        })
}

/// 读取名为 `image` 的字段，校验类型和大小
async fn read_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<Option<Upload>, (StatusCode, String)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
        if !ALLOWED_TYPES.contains(&content_type.as_str()) {
            return Err((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Only JPG, PNG, and WEBP are supported".to_string(),
            ));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.len() > max_bytes {
            return Err((
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Image exceeds {} bytes", max_bytes),
            ));
        }

        return Ok(Some(Upload {
            bytes: Arc::from(bytes.as_ref()),
            content_type,
        }));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError) -> (StatusCode, String) {
    (e.status(), e.body_text())
}
