// ==========================================
// 生产链KPI引擎 - KPI目标数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 周/日树必须整树落库, 读取方只见变更前或变更后的树
// ==========================================
// 表结构:
//   kpi_target (kpi_id PK, chain_id, total_value, start_date, end_date,
//               revision, created_at, updated_at)
//   kpi_week   (kpi_id, week_index, start_date, end_date, target_value,
//               PK(kpi_id, week_index))
//   kpi_day    (kpi_id, day_date, week_index, target_value, is_attending,
//               PK(kpi_id, day_date))
// ==========================================

use crate::domain::kpi::{Day, KpiTarget, Week};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_date(s: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT)
        .map_err(|_| RepositoryError::ValidationError(format!("无法解析日期列: {}", s)))
}

// ==========================================
// KpiTargetRepository - KPI目标仓储
// ==========================================

/// KPI目标仓储
/// 职责: kpi_target / kpi_week / kpi_day 三表的整树读写
pub struct KpiTargetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl KpiTargetRepository {
    /// 从共享连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建KPI目标 (目标+周+日, 单事务)
    pub fn create(&self, kpi: &KpiTarget) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        tx.execute(
            r#"
            INSERT INTO kpi_target (
                kpi_id, chain_id, total_value, start_date, end_date,
                revision, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                kpi.kpi_id,
                kpi.chain_id,
                kpi.total_value,
                kpi.start_date.format(DATE_FMT).to_string(),
                kpi.end_date.format(DATE_FMT).to_string(),
                kpi.revision,
                kpi.created_at.format(DATETIME_FMT).to_string(),
                kpi.updated_at.format(DATETIME_FMT).to_string(),
            ],
        )?;

        Self::insert_tree(&tx, kpi)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 按ID读取完整目标树 (周/日按时间序)
    pub fn find_by_id(&self, kpi_id: &str) -> RepositoryResult<Option<KpiTarget>> {
        let conn = self.get_conn()?;

        // 日期列在行映射外解析: 损坏数据报 ValidationError, 不落哨兵值
        let target = conn
            .query_row(
                r#"
                SELECT kpi_id, chain_id, total_value, start_date, end_date,
                       revision, created_at, updated_at
                FROM kpi_target WHERE kpi_id = ?1
                "#,
                params![kpi_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i32>(5)?,
                        row.get::<_, chrono::NaiveDateTime>(6)?,
                        row.get::<_, chrono::NaiveDateTime>(7)?,
                    ))
                },
            )
            .optional()?;

        let (id, chain_id, total_value, start_s, end_s, revision, created_at, updated_at) =
            match target {
                Some(t) => t,
                None => return Ok(None),
            };

        let mut kpi = KpiTarget {
            kpi_id: id,
            chain_id,
            total_value,
            start_date: parse_date(&start_s)?,
            end_date: parse_date(&end_s)?,
            weeks: Vec::new(),
            revision,
            created_at,
            updated_at,
        };

        let mut week_stmt = conn.prepare(
            r#"
            SELECT week_index, start_date, end_date, target_value
            FROM kpi_week WHERE kpi_id = ?1 ORDER BY week_index
            "#,
        )?;
        let week_rows = week_stmt
            .query_map(params![kpi_id], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (week_index, start_s, end_s, target_value) in week_rows {
            kpi.weeks.push(Week {
                week_index,
                start_date: parse_date(&start_s)?,
                end_date: parse_date(&end_s)?,
                target_value,
                is_completed: false,
                days: Vec::new(),
            });
        }

        let mut day_stmt = conn.prepare(
            r#"
            SELECT day_date, week_index, target_value, is_attending
            FROM kpi_day WHERE kpi_id = ?1 ORDER BY day_date
            "#,
        )?;
        let day_rows = day_stmt
            .query_map(params![kpi_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, bool>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for (date_s, week_index, target_value, is_attending) in day_rows {
            let date = parse_date(&date_s)?;
            if let Some(week) = kpi.find_week_mut(week_index) {
                week.days.push(Day {
                    date,
                    target_value,
                    is_completed: false,
                    is_attending,
                });
            }
        }

        Ok(Some(kpi))
    }

    /// 按生产链列出KPI目标ID
    pub fn list_ids_by_chain(&self, chain_id: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT kpi_id FROM kpi_target WHERE chain_id = ?1 ORDER BY start_date")?;
        let ids = stmt
            .query_map(params![chain_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// 整树保存 (乐观锁)
    ///
    /// revision 不匹配时拒绝并报告实际修订号, 调用方据此重试;
    /// 周/日整体重写与目标行更新在同一事务内
    pub fn save_tree(&self, kpi: &KpiTarget) -> RepositoryResult<i32> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let new_revision = kpi.revision + 1;
        let updated = tx.execute(
            r#"
            UPDATE kpi_target
            SET total_value = ?1, revision = ?2, updated_at = datetime('now')
            WHERE kpi_id = ?3 AND revision = ?4
            "#,
            params![kpi.total_value, new_revision, kpi.kpi_id, kpi.revision],
        )?;

        if updated == 0 {
            let actual: Option<i32> = tx
                .query_row(
                    "SELECT revision FROM kpi_target WHERE kpi_id = ?1",
                    params![kpi.kpi_id],
                    |row| row.get(0),
                )
                .optional()?;
            return match actual {
                Some(actual) => Err(RepositoryError::OptimisticLockFailure {
                    kpi_id: kpi.kpi_id.clone(),
                    expected: kpi.revision,
                    actual,
                }),
                None => Err(RepositoryError::NotFound {
                    entity: "kpi_target".to_string(),
                    id: kpi.kpi_id.clone(),
                }),
            };
        }

        tx.execute("DELETE FROM kpi_week WHERE kpi_id = ?1", params![kpi.kpi_id])?;
        tx.execute("DELETE FROM kpi_day WHERE kpi_id = ?1", params![kpi.kpi_id])?;
        Self::insert_tree(&tx, kpi)?;

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(new_revision)
    }

    /// 删除KPI目标及其周/日行
    pub fn delete(&self, kpi_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        tx.execute("DELETE FROM kpi_day WHERE kpi_id = ?1", params![kpi_id])?;
        tx.execute("DELETE FROM kpi_week WHERE kpi_id = ?1", params![kpi_id])?;
        tx.execute("DELETE FROM kpi_target WHERE kpi_id = ?1", params![kpi_id])?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    /// 周/日行批量写入 (create / save_tree 共用)
    fn insert_tree(tx: &rusqlite::Transaction<'_>, kpi: &KpiTarget) -> RepositoryResult<()> {
        for week in &kpi.weeks {
            tx.execute(
                r#"
                INSERT INTO kpi_week (kpi_id, week_index, start_date, end_date, target_value)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    kpi.kpi_id,
                    week.week_index,
                    week.start_date.format(DATE_FMT).to_string(),
                    week.end_date.format(DATE_FMT).to_string(),
                    week.target_value,
                ],
            )?;
            for day in &week.days {
                tx.execute(
                    r#"
                    INSERT INTO kpi_day (kpi_id, day_date, week_index, target_value, is_attending)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                    params![
                        kpi.kpi_id,
                        day.date.format(DATE_FMT).to_string(),
                        week.week_index,
                        day.target_value,
                        day.is_attending,
                    ],
                )?;
            }
        }
        Ok(())
    }
}
