// ==========================================
// 生产链接口端到端测试
// ==========================================
// 测试范围:
// 1. 工作单元推进与链完成
// 2. NoAssignee 时不丢单元
// 3. 步骤锁定谓词 (台账驱动)
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use prod_chain_kpi::api::{AdvanceResult, ApiError, ChainApi, KpiApi};
use prod_chain_kpi::config::EngineConfig;
use prod_chain_kpi::domain::ChainStep;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> (tempfile::NamedTempFile, Arc<Mutex<Connection>>, ChainApi) {
    let (temp_file, db_path) = test_helpers::create_test_db().expect("创建测试数据库失败");
    let conn = Arc::new(Mutex::new(
        test_helpers::open_test_connection(&db_path).expect("打开数据库失败"),
    ));
    let api = ChainApi::from_connection(conn.clone());
    (temp_file, conn, api)
}

/// 造一条 D1 → D2 → D3 的链, D2/D3 各一名成员
fn seed_chain(conn: &Arc<Mutex<Connection>>, chain_id: &str) {
    let guard = conn.lock().unwrap();
    test_helpers::insert_chain_step(&guard, chain_id, 1, "D1", "制坯").unwrap();
    test_helpers::insert_chain_step(&guard, chain_id, 2, "D2", "精整").unwrap();
    test_helpers::insert_chain_step(&guard, chain_id, 3, "D3", "质检").unwrap();
    test_helpers::insert_member(&guard, "D1", "u1", "一号工").unwrap();
    test_helpers::insert_member(&guard, "D2", "u2", "二号工").unwrap();
    test_helpers::insert_member(&guard, "D3", "u3", "三号工").unwrap();
}

// ==========================================
// 推进
// ==========================================

#[test]
fn test_advance_creates_unit_in_next_department() {
    let (_tmp, conn, api) = setup();
    seed_chain(&conn, "CHAIN1");
    {
        let guard = conn.lock().unwrap();
        test_helpers::insert_work_unit(&guard, "U1", "CHAIN1", 1, "D1", "u1", "IN_PROGRESS")
            .unwrap();
    }

    let result = api.advance_work_unit("U1").unwrap();
    let next = match result {
        AdvanceResult::Advanced(unit) => unit,
        AdvanceResult::ChainCompleted => panic!("期望推进到步骤2"),
    };
    assert_eq!(next.step_order, 2);
    assert_eq!(next.department_id, "D2");
    assert_eq!(next.assignee_id, "u2");

    // 原单元已完成
    let status: String = {
        let guard = conn.lock().unwrap();
        guard
            .query_row(
                "SELECT status FROM work_unit WHERE unit_id = 'U1'",
                [],
                |row| row.get(0),
            )
            .unwrap()
    };
    assert_eq!(status, "COMPLETED");

    // 新单元可继续领取并推进
    api.start_work_unit(&next.unit_id).unwrap();
    let result = api.advance_work_unit(&next.unit_id).unwrap();
    assert!(matches!(result, AdvanceResult::Advanced(_)));
}

#[test]
fn test_advance_at_last_step_completes_chain() {
    let (_tmp, conn, api) = setup();
    seed_chain(&conn, "CHAIN1");
    {
        let guard = conn.lock().unwrap();
        test_helpers::insert_work_unit(&guard, "U3", "CHAIN1", 3, "D3", "u3", "IN_PROGRESS")
            .unwrap();
    }

    let result = api.advance_work_unit("U3").unwrap();
    assert!(matches!(result, AdvanceResult::ChainCompleted));
}

#[test]
fn test_advance_without_members_keeps_unit() {
    let (_tmp, conn, api) = setup();
    {
        let guard = conn.lock().unwrap();
        test_helpers::insert_chain_step(&guard, "CHAIN2", 1, "D1", "制坯").unwrap();
        test_helpers::insert_chain_step(&guard, "CHAIN2", 2, "D9", "空部门").unwrap();
        test_helpers::insert_work_unit(&guard, "U9", "CHAIN2", 1, "D1", "u1", "IN_PROGRESS")
            .unwrap();
    }

    let result = api.advance_work_unit("U9");
    assert!(matches!(result, Err(ApiError::NoAssignee { .. })));

    // 单元未被吞掉: 状态保持, 调用方可补成员后重试
    let status: String = {
        let guard = conn.lock().unwrap();
        guard
            .query_row(
                "SELECT status FROM work_unit WHERE unit_id = 'U9'",
                [],
                |row| row.get(0),
            )
            .unwrap()
    };
    assert_eq!(status, "IN_PROGRESS");

    {
        let guard = conn.lock().unwrap();
        test_helpers::insert_member(&guard, "D9", "u9", "补位工").unwrap();
    }
    assert!(api.advance_work_unit("U9").is_ok());
}

#[test]
fn test_pending_unit_must_be_started_before_advance() {
    let (_tmp, conn, api) = setup();
    seed_chain(&conn, "CHAIN1");
    {
        let guard = conn.lock().unwrap();
        test_helpers::insert_work_unit(&guard, "U1", "CHAIN1", 1, "D1", "u1", "PENDING").unwrap();
    }

    // PENDING 不可越过 IN_PROGRESS 直接完成
    let result = api.advance_work_unit("U1");
    assert!(matches!(
        result,
        Err(ApiError::InvalidStateTransition { .. })
    ));

    api.start_work_unit("U1").unwrap();
    assert!(api.advance_work_unit("U1").is_ok());
}

#[test]
fn test_completed_unit_cannot_advance_again() {
    let (_tmp, conn, api) = setup();
    seed_chain(&conn, "CHAIN1");
    {
        let guard = conn.lock().unwrap();
        test_helpers::insert_work_unit(&guard, "U1", "CHAIN1", 1, "D1", "u1", "COMPLETED")
            .unwrap();
    }
    let result = api.advance_work_unit("U1");
    assert!(matches!(
        result,
        Err(ApiError::InvalidStateTransition { .. })
    ));
}

// ==========================================
// 步骤锁定谓词
// ==========================================

#[test]
fn test_steps_lock_once_any_completion_exists() {
    let (_tmp, conn, api) = setup();
    seed_chain(&conn, "CHAIN1");
    assert!(!api.steps_locked("CHAIN1").unwrap());

    // 链下建KPI并完成一天 → 谓词翻转
    let kpi_api = KpiApi::from_connection(conn.clone(), EngineConfig::default());
    let kpi = kpi_api
        .create_kpi_target("CHAIN1", 10, date(2024, 5, 6), date(2024, 5, 10))
        .unwrap();
    assert!(!api.steps_locked("CHAIN1").unwrap());

    kpi_api
        .toggle_day_completion(&kpi.kpi_id, date(2024, 5, 6), "user_a")
        .unwrap();
    assert!(api.steps_locked("CHAIN1").unwrap());

    // 锁定后: 部门变更被拒, 标题编辑与追加仍允许
    let result = api.change_step_department("CHAIN1", 2, "D3");
    assert!(matches!(result, Err(ApiError::ChainStepsLocked { .. })));
    api.rename_step("CHAIN1", 2, "精整(改)").unwrap();
    api.add_step(ChainStep {
        chain_id: "CHAIN1".to_string(),
        step_order: 4,
        department_id: "D2".to_string(),
        title: "复检".to_string(),
    })
    .unwrap();

    // 取消完成记录后解锁
    kpi_api
        .toggle_day_completion(&kpi.kpi_id, date(2024, 5, 6), "user_a")
        .unwrap();
    assert!(!api.steps_locked("CHAIN1").unwrap());
    api.change_step_department("CHAIN1", 2, "D3").unwrap();
}

#[test]
fn test_add_step_validates_structure() {
    let (_tmp, conn, api) = setup();
    seed_chain(&conn, "CHAIN1");

    // 序号跳空被拒绝
    let result = api.add_step(ChainStep {
        chain_id: "CHAIN1".to_string(),
        step_order: 6,
        department_id: "D2".to_string(),
        title: "悬空步骤".to_string(),
    });
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
}
