// ==========================================
// 生产链KPI引擎 - 领域层
// ==========================================
// 职责: 实体与类型定义, 不含持久化与业务规则
// ==========================================

pub mod chain;
pub mod completion;
pub mod kpi;
pub mod types;

pub use chain::{validate_steps, ChainStep, DepartmentMember, WorkUnit};
pub use completion::{CompletionLedger, CompletionRecord, LedgerMutation};
pub use kpi::{Day, KpiTarget, Week};
pub use types::{is_working_day, CompletionKind, TargetRef, WorkUnitStatus};
