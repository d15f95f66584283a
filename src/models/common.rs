use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 错误响应体 `{"success": false, "error": {...}}` 中的 error 部分
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// 通用分页查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct PageQuery {
    /// 页码 (默认 1)
    pub page: Option<u32>,
    /// 每页数量 (默认 20)
    pub per_page: Option<u32>,
}

/// 后台清理任务结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SweepResponse {
    pub affected: u64,
}
