// ==========================================
// 生产链KPI引擎 - 配额再分配引擎
// ==========================================
// 红线: 已锁定 (完成) 的日目标值永不被再分配触碰
// 红线: 校验失败时不留下任何部分变更
// ==========================================
// 职责: 日/周/总配额的再分配计算
// 输入: KPI目标树 + 台账快照 + 新目标值
// 输出: 原地更新后的目标树 (周目标恒为日合计)
// ==========================================

mod core;


pub use core::RedistributionEngine;
