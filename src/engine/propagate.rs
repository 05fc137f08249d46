// ==========================================
// 生产链KPI引擎 - 完成传播引擎
// ==========================================
// 红线: 周完成是日完成的派生事实, 一经日级切换即不再独立为真
// 红线: 传播引擎不抛业务错误, 只派生一致性指令
// ==========================================
// 职责: 日↔周完成状态的双向联动规则 (R1/R2)
// 输入: KPI目标快照 + 台账快照
// 输出: 待原子应用的台账变更指令
// ==========================================

mod core;


pub use core::CompletionPropagator;
