// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

use prod_chain_kpi::db;
use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件 (需要保持存活)
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 打开测试连接 (统一 PRAGMA)
pub fn open_test_connection(db_path: &str) -> Result<Connection, Box<dyn Error>> {
    Ok(db::open_sqlite_connection(db_path)?)
}

/// 初始化数据库 schema
fn init_schema(conn: &Connection) -> Result<(), Box<dyn Error>> {
    // KPI目标树
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS kpi_target (
            kpi_id TEXT PRIMARY KEY,
            chain_id TEXT NOT NULL,
            total_value INTEGER NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            revision INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS kpi_week (
            kpi_id TEXT NOT NULL,
            week_index INTEGER NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            target_value INTEGER NOT NULL,
            PRIMARY KEY (kpi_id, week_index)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS kpi_day (
            kpi_id TEXT NOT NULL,
            day_date TEXT NOT NULL,
            week_index INTEGER NOT NULL,
            target_value INTEGER NOT NULL,
            is_attending INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (kpi_id, day_date)
        )
        "#,
        [],
    )?;

    // 完成台账 (唯一性不变式由主键承担)
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS completion_record (
            kpi_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            target_ref TEXT NOT NULL,
            recorded_by TEXT NOT NULL,
            recorded_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (kpi_id, kind, target_ref)
        )
        "#,
        [],
    )?;

    // 生产链
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS chain_step (
            chain_id TEXT NOT NULL,
            step_order INTEGER NOT NULL,
            department_id TEXT NOT NULL,
            title TEXT NOT NULL,
            PRIMARY KEY (chain_id, step_order)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS department_member (
            department_id TEXT NOT NULL,
            member_id TEXT NOT NULL,
            member_name TEXT NOT NULL,
            PRIMARY KEY (department_id, member_id)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS work_unit (
            unit_id TEXT PRIMARY KEY,
            chain_id TEXT NOT NULL,
            step_order INTEGER NOT NULL,
            department_id TEXT NOT NULL,
            assignee_id TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    Ok(())
}

/// 插入链步骤
pub fn insert_chain_step(
    conn: &Connection,
    chain_id: &str,
    step_order: u32,
    department_id: &str,
    title: &str,
) -> Result<(), Box<dyn Error>> {
    conn.execute(
        "INSERT INTO chain_step (chain_id, step_order, department_id, title) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![chain_id, step_order, department_id, title],
    )?;
    Ok(())
}

/// 插入部门成员
pub fn insert_member(
    conn: &Connection,
    department_id: &str,
    member_id: &str,
    member_name: &str,
) -> Result<(), Box<dyn Error>> {
    conn.execute(
        "INSERT INTO department_member (department_id, member_id, member_name) VALUES (?1, ?2, ?3)",
        rusqlite::params![department_id, member_id, member_name],
    )?;
    Ok(())
}

/// 插入工作单元
pub fn insert_work_unit(
    conn: &Connection,
    unit_id: &str,
    chain_id: &str,
    step_order: u32,
    department_id: &str,
    assignee_id: &str,
    status: &str,
) -> Result<(), Box<dyn Error>> {
    conn.execute(
        r#"
        INSERT INTO work_unit (
            unit_id, chain_id, step_order, department_id, assignee_id,
            status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'), datetime('now'))
        "#,
        rusqlite::params![unit_id, chain_id, step_order, department_id, assignee_id, status],
    )?;
    Ok(())
}
