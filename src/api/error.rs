// ==========================================
// 生产链KPI引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 转换引擎/仓储错误为用户可读的消息
// 红线: 每个拒绝必须携带具体错误种类与冲突数量, 不允许笼统失败
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("锁定单元不可编辑: {0}")]
    LockedUnit(String),

    #[error("新总配额低于已完成数量: 请求设为{requested}, 已完成{locked_sum}")]
    OverCommitted { requested: i64, locked_sum: i64 },

    #[error("目标部门无可承接成员: department_id={department_id}")]
    NoAssignee { department_id: String },

    #[error("生产链步骤已锁定: chain_id={chain_id} 下已存在完成记录, 仅允许追加步骤或修改标题")]
    ChainStepsLocked { chain_id: String },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("乐观锁冲突: {0}")]
    OptimisticLockFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),
}

/// API层统一 Result 类型
pub type ApiResult<T> = Result<T, ApiError>;

// 引擎错误逐类映射, 保留错误种类与冲突数量
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::InvalidRange { .. } | EngineError::InvalidQuantity { .. } => {
                ApiError::InvalidInput(err.to_string())
            }
            EngineError::LockedUnit { message } => ApiError::LockedUnit(message),
            EngineError::OverCommitted {
                requested,
                locked_sum,
            } => ApiError::OverCommitted {
                requested,
                locked_sum,
            },
            EngineError::NoAssignee { department_id } => ApiError::NoAssignee { department_id },
            EngineError::WeekNotFound { .. } | EngineError::DayNotFound { .. } => {
                ApiError::NotFound(err.to_string())
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} id={}", entity, id))
            }
            RepositoryError::OptimisticLockFailure { .. } => {
                ApiError::OptimisticLockFailure(err.to_string())
            }
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}
