// ==========================================
// 生产链KPI引擎 - 生产链领域模型
// ==========================================
// 红线: 链上任一KPI存在完成记录后, 步骤只允许追加/改标题
// (锁定判定是对台账的谓词查询, 不落为链上的布尔字段)
// ==========================================

use crate::domain::types::WorkUnitStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ==========================================
// ChainStep - 生产链步骤
// ==========================================
// step_order 链内唯一, 从1起连续
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStep {
    pub chain_id: String,      // 所属生产链
    pub step_order: u32,       // 步骤序号
    pub department_id: String, // 承接部门
    pub title: String,         // 步骤标题
}

/// 校验步骤序列: 序号从1起连续, 且至少覆盖2个不同部门
///
/// # 返回
/// - Ok(()): 合法
/// - Err(String): 违规原因 (供API层包装为 InvalidInput)
pub fn validate_steps(steps: &[ChainStep]) -> Result<(), String> {
    if steps.is_empty() {
        return Err("生产链至少需要1个步骤".to_string());
    }

    for (i, step) in steps.iter().enumerate() {
        let expected = (i + 1) as u32;
        if step.step_order != expected {
            return Err(format!(
                "步骤序号必须从1起连续: 位置{}的序号为{}",
                expected, step.step_order
            ));
        }
    }

    let departments: HashSet<&str> = steps.iter().map(|s| s.department_id.as_str()).collect();
    if departments.len() < 2 {
        return Err(format!(
            "生产链步骤至少需要2个不同部门, 当前只有{}个",
            departments.len()
        ));
    }

    Ok(())
}

// ==========================================
// WorkUnit - 工作单元
// ==========================================
// 一个步骤上的一份流转工作, 完成后由顺序器推进到后继步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkUnit {
    pub unit_id: String,           // 工作单元ID
    pub chain_id: String,          // 所属生产链
    pub step_order: u32,           // 当前步骤序号
    pub department_id: String,     // 当前承接部门
    pub assignee_id: String,       // 承接人
    pub status: WorkUnitStatus,    // 状态
    pub created_at: NaiveDateTime, // 创建时间
    pub updated_at: NaiveDateTime, // 更新时间
}

// ==========================================
// DepartmentMember - 部门成员 (外部只读数据)
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentMember {
    pub department_id: String,
    pub member_id: String,
    pub member_name: String,
}
