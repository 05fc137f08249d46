// ==========================================
// 生产链KPI引擎 - 生产链数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 表结构:
//   chain_step        (chain_id, step_order, department_id, title,
//                      PK(chain_id, step_order))
//   department_member (department_id, member_id, member_name)
//   work_unit         (unit_id PK, chain_id, step_order, department_id,
//                      assignee_id, status, created_at, updated_at)
// 链步骤与部门成员对本引擎是外部数据, 这里只做只读/受限写入
// ==========================================

use crate::domain::chain::{ChainStep, DepartmentMember, WorkUnit};
use crate::domain::types::WorkUnitStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// ChainStepRepository - 链步骤仓储
// ==========================================

/// 链步骤仓储
/// 职责: chain_step / department_member 的读取与受限写入
pub struct ChainStepRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChainStepRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按链列出步骤 (序号升序)
    pub fn list_steps(&self, chain_id: &str) -> RepositoryResult<Vec<ChainStep>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT chain_id, step_order, department_id, title
            FROM chain_step WHERE chain_id = ?1 ORDER BY step_order
            "#,
        )?;
        let steps = stmt
            .query_map(params![chain_id], |row| {
                Ok(ChainStep {
                    chain_id: row.get(0)?,
                    step_order: row.get(1)?,
                    department_id: row.get(2)?,
                    title: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(steps)
    }

    /// 追加步骤
    pub fn create_step(&self, step: &ChainStep) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO chain_step (chain_id, step_order, department_id, title)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                step.chain_id,
                step.step_order,
                step.department_id,
                step.title
            ],
        )?;
        Ok(())
    }

    /// 修改步骤标题 (锁定后唯一允许的编辑)
    pub fn update_step_title(
        &self,
        chain_id: &str,
        step_order: u32,
        title: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE chain_step SET title = ?1 WHERE chain_id = ?2 AND step_order = ?3",
            params![title, chain_id, step_order],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "chain_step".to_string(),
                id: format!("{}#{}", chain_id, step_order),
            });
        }
        Ok(())
    }

    /// 变更步骤承接部门 (锁定校验由API层完成)
    pub fn update_step_department(
        &self,
        chain_id: &str,
        step_order: u32,
        department_id: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE chain_step SET department_id = ?1 WHERE chain_id = ?2 AND step_order = ?3",
            params![department_id, chain_id, step_order],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "chain_step".to_string(),
                id: format!("{}#{}", chain_id, step_order),
            });
        }
        Ok(())
    }

    /// 部门成员查询 (承接人选择用, 外部只读数据)
    pub fn list_members(&self, department_id: &str) -> RepositoryResult<Vec<DepartmentMember>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT department_id, member_id, member_name
            FROM department_member WHERE department_id = ?1 ORDER BY member_id
            "#,
        )?;
        let members = stmt
            .query_map(params![department_id], |row| {
                Ok(DepartmentMember {
                    department_id: row.get(0)?,
                    member_id: row.get(1)?,
                    member_name: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(members)
    }
}

// ==========================================
// WorkUnitRepository - 工作单元仓储
// ==========================================

/// 工作单元仓储
/// 职责: work_unit 表的CRUD
pub struct WorkUnitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WorkUnitRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create(&self, unit: &WorkUnit) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO work_unit (
                unit_id, chain_id, step_order, department_id, assignee_id,
                status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'), datetime('now'))
            "#,
            params![
                unit.unit_id,
                unit.chain_id,
                unit.step_order,
                unit.department_id,
                unit.assignee_id,
                unit.status.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, unit_id: &str) -> RepositoryResult<Option<WorkUnit>> {
        let conn = self.get_conn()?;
        let unit = conn
            .query_row(
                r#"
                SELECT unit_id, chain_id, step_order, department_id, assignee_id,
                       status, created_at, updated_at
                FROM work_unit WHERE unit_id = ?1
                "#,
                params![unit_id],
                |row| {
                    let status_s: String = row.get(5)?;
                    Ok(WorkUnit {
                        unit_id: row.get(0)?,
                        chain_id: row.get(1)?,
                        step_order: row.get(2)?,
                        department_id: row.get(3)?,
                        assignee_id: row.get(4)?,
                        status: WorkUnitStatus::parse(&status_s)
                            .unwrap_or(WorkUnitStatus::Pending),
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(unit)
    }

    pub fn update_status(&self, unit_id: &str, status: WorkUnitStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE work_unit SET status = ?1, updated_at = datetime('now') WHERE unit_id = ?2",
            params![status.as_str(), unit_id],
        )?;
        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "work_unit".to_string(),
                id: unit_id.to_string(),
            });
        }
        Ok(())
    }
}
