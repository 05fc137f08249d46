// ==========================================
// 生产链KPI引擎 - API 层
// ==========================================
// 职责: 提供业务 API 接口, 供Web层 (范围外) 调用
// ==========================================

pub mod chain_api;
pub mod error;
pub mod kpi_api;

// 重导出核心类型
pub use chain_api::{AdvanceResult, ChainApi};
pub use error::{ApiError, ApiResult};
pub use kpi_api::{DayView, KpiApi, KpiTargetView, WeekView};
