// ==========================================
// 生产链KPI引擎 - 引擎层错误类型
// ==========================================
// 红线: 所有拒绝必须携带具体冲突数量, 不允许笼统失败
// 工具: thiserror 派生宏
// ==========================================

use chrono::NaiveDate;
use thiserror::Error;

/// 引擎层错误类型
///
/// 全部为可恢复的用户侧错误, 不代表内部状态损坏;
/// 校验错误在检测点同步抛出, 调用方保证不留下部分变更
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 构造期校验 =====
    #[error("无效日期范围: start={start} > end={end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("无效配额数量: {value} (必须为非负整数)")]
    InvalidQuantity { value: i64 },

    // ===== 锁定保护 =====
    #[error("锁定单元不可编辑: {message}")]
    LockedUnit { message: String },

    // ===== 再分配约束 =====
    #[error("新总配额低于已完成数量: 请求设为{requested}, 已完成{locked_sum}")]
    OverCommitted { requested: i64, locked_sum: i64 },

    // ===== 链推进 =====
    #[error("目标部门无可承接成员: department_id={department_id}")]
    NoAssignee { department_id: String },

    // ===== 定位失败 =====
    #[error("周不存在: week_index={week_index}")]
    WeekNotFound { week_index: u32 },

    #[error("日不存在: date={date}")]
    DayNotFound { date: NaiveDate },
}

/// 引擎层统一 Result 类型
pub type EngineResult<T> = Result<T, EngineError>;
