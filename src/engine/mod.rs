// ==========================================
// 生产链KPI引擎 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎, 不拼 SQL
// 红线: 引擎为纯函数 (状态入/状态出), 服务端与客户端镜像共用同一实现,
// 不允许在两个运行时各自再推导一遍算法
// ==========================================

pub mod error;
pub mod partition;
pub mod propagate;
pub mod redistribute;
pub mod sequencer;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use partition::{split_evenly, CalendarPartitioner};
pub use propagate::CompletionPropagator;
pub use redistribute::RedistributionEngine;
pub use sequencer::{AdvanceOutcome, ChainStepSequencer};
