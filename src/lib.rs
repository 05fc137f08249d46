// ==========================================
// 生产链KPI配额引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 层级配额分配与完成同步 (算法单实现, 服务端/客户端共用)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 策略开关
pub mod config;

// 数据库基础设施 (连接初始化/PRAGMA 统一)
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CompletionKind, TargetRef, WorkUnitStatus};

// 领域实体
pub use domain::{
    ChainStep, CompletionLedger, CompletionRecord, Day, DepartmentMember, KpiTarget,
    LedgerMutation, Week, WorkUnit,
};

// 引擎
pub use engine::{
    AdvanceOutcome, CalendarPartitioner, ChainStepSequencer, CompletionPropagator, EngineError,
    RedistributionEngine,
};

// 配置
pub use config::EngineConfig;

// API
pub use api::{ChainApi, KpiApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "生产链KPI配额引擎";
