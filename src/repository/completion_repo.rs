// ==========================================
// 生产链KPI引擎 - 完成记录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 同一KPI的一组台账变更必须单事务落库 (日/周标记不允许出现分叉)
// ==========================================
// 表结构:
//   completion_record (kpi_id, kind, target_ref, recorded_by, recorded_at,
//                      PK(kpi_id, kind, target_ref))
// 唯一性不变式由主键承担: 每个 (kind, target_ref) 至多一条有效记录
// ==========================================

use crate::domain::completion::{CompletionLedger, CompletionRecord, LedgerMutation};
use crate::domain::types::{CompletionKind, TargetRef};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// CompletionRecordRepository - 完成记录仓储
// ==========================================

/// 完成记录仓储
/// 职责: completion_record 表的幂等标记/取消/查询
pub struct CompletionRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompletionRecordRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 列出一个KPI的全部完成记录
    pub fn list_by_kpi(&self, kpi_id: &str) -> RepositoryResult<Vec<CompletionRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT kind, target_ref, recorded_by, recorded_at
            FROM completion_record
            WHERE kpi_id = ?1
            ORDER BY target_ref
            "#,
        )?;

        let rows = stmt.query_map(params![kpi_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, chrono::NaiveDateTime>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (kind_s, ref_s, recorded_by, recorded_at) = row?;
            let kind = CompletionKind::parse(&kind_s).ok_or_else(|| {
                RepositoryError::ValidationError(format!("未知的记录种类: {}", kind_s))
            })?;
            let target_ref = TargetRef::parse(&ref_s).ok_or_else(|| {
                RepositoryError::ValidationError(format!("无法解析目标引用: {}", ref_s))
            })?;
            records.push(CompletionRecord {
                kind,
                target_ref,
                recorded_by,
                recorded_at,
            });
        }
        Ok(records)
    }

    /// 加载一个KPI的台账快照 (供引擎层纯函数使用)
    pub fn load_ledger(&self, kpi_id: &str) -> RepositoryResult<CompletionLedger> {
        Ok(CompletionLedger::from_records(self.list_by_kpi(kpi_id)?))
    }

    /// 单事务应用一组台账变更指令 (全有或全无)
    ///
    /// 同事务内推进所属目标的修订号: 台账变更会改变 locked_sum,
    /// 任何基于旧台账快照的整树保存必须被乐观锁拒绝
    pub fn apply_mutations(
        &self,
        kpi_id: &str,
        mutations: &[LedgerMutation],
    ) -> RepositoryResult<()> {
        if mutations.is_empty() {
            return Ok(());
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for mutation in mutations {
            match mutation {
                LedgerMutation::Mark {
                    target_ref,
                    recorded_by,
                } => Self::mark_in(&tx, kpi_id, *target_ref, recorded_by)?,
                LedgerMutation::Unmark { target_ref } => {
                    Self::unmark_in(&tx, kpi_id, *target_ref)?
                }
            }
        }

        let bumped = tx.execute(
            r#"
            UPDATE kpi_target
            SET revision = revision + 1, updated_at = datetime('now')
            WHERE kpi_id = ?1
            "#,
            params![kpi_id],
        )?;
        if bumped == 0 {
            return Err(RepositoryError::NotFound {
                entity: "kpi_target".to_string(),
                id: kpi_id.to_string(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 链锁定谓词: 该链下任一KPI是否存在完成记录
    ///
    /// 有意不落为链上的布尔字段, 避免与台账漂移的第二事实来源
    pub fn exists_any_for_chain(&self, chain_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM completion_record cr
            JOIN kpi_target kt ON kt.kpi_id = cr.kpi_id
            WHERE kt.chain_id = ?1
            "#,
            params![chain_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn mark_in(
        conn: &Connection,
        kpi_id: &str,
        target_ref: TargetRef,
        recorded_by: &str,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            INSERT OR IGNORE INTO completion_record
                (kpi_id, kind, target_ref, recorded_by, recorded_at)
            VALUES (?1, ?2, ?3, ?4, datetime('now'))
            "#,
            params![
                kpi_id,
                target_ref.kind().as_str(),
                target_ref.as_db_string(),
                recorded_by,
            ],
        )?;
        Ok(())
    }

    fn unmark_in(conn: &Connection, kpi_id: &str, target_ref: TargetRef) -> RepositoryResult<()> {
        conn.execute(
            r#"
            DELETE FROM completion_record
            WHERE kpi_id = ?1 AND kind = ?2 AND target_ref = ?3
            "#,
            params![
                kpi_id,
                target_ref.kind().as_str(),
                target_ref.as_db_string()
            ],
        )?;
        Ok(())
    }
}
