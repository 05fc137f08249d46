// ==========================================
// 生产链KPI引擎 - 数据仓储层
// ==========================================
// 职责: SQLite 数据访问, 不含业务规则
// 并发模型: 共享 Arc<Mutex<Connection>> 单写者串行化,
// 同一KPI的读改写序列由API层在持有引擎结果后单事务落库
// ==========================================

pub mod chain_repo;
pub mod completion_repo;
pub mod error;
pub mod kpi_repo;

pub use chain_repo::{ChainStepRepository, WorkUnitRepository};
pub use completion_repo::CompletionRecordRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use kpi_repo::KpiTargetRepository;
