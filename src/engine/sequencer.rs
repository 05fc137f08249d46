// ==========================================
// 生产链KPI引擎 - 链步骤顺序器
// ==========================================
// 状态机: PENDING → IN_PROGRESS → COMPLETED, 完成后推进到后继步骤
// 红线: 后继部门无成员时必须报错, 不允许静默丢弃工作单元
// ==========================================
// 职责: 工作单元在部门间的顺序流转
// 输入: 链步骤序列 (外部只读) + 当前工作单元 + 后继部门成员
// 输出: 新工作单元 或 链完成
// ==========================================

use crate::domain::chain::{ChainStep, DepartmentMember, WorkUnit};
use crate::domain::types::WorkUnitStatus;
use crate::engine::error::{EngineError, EngineResult};
use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

// ==========================================
// AdvanceOutcome - 推进结果
// ==========================================
#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    /// 已生成后继步骤的新工作单元
    Advanced(WorkUnit),
    /// 无后继步骤, 本轮链流转完成
    ChainCompleted,
}

// ==========================================
// ChainStepSequencer - 链步骤顺序器
// ==========================================
pub struct ChainStepSequencer {
    // 无状态引擎
}

impl Default for ChainStepSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStepSequencer {
    pub fn new() -> Self {
        Self {}
    }

    /// 完成当前工作单元并推进到后继步骤
    ///
    /// 承接人取成员列表首位 —— 选择策略属外部协作方,
    /// 调用方负责按其策略排序后传入
    ///
    /// # 返回
    /// - Ok(Advanced): 后继步骤的新工作单元 (PENDING)
    /// - Ok(ChainCompleted): 当前步骤为末步
    /// - Err(NoAssignee): 后继部门无成员
    #[instrument(skip_all, fields(
        unit_id = %unit.unit_id,
        chain_id = %unit.chain_id,
        step_order = unit.step_order
    ))]
    pub fn advance(
        &self,
        steps: &[ChainStep],
        unit: &WorkUnit,
        successor_members: &[DepartmentMember],
    ) -> EngineResult<AdvanceOutcome> {
        let successor = steps
            .iter()
            .find(|s| s.step_order == unit.step_order + 1);

        let successor = match successor {
            Some(s) => s,
            None => return Ok(AdvanceOutcome::ChainCompleted),
        };

        let assignee = successor_members
            .iter()
            .find(|m| m.department_id == successor.department_id)
            .ok_or_else(|| EngineError::NoAssignee {
                department_id: successor.department_id.clone(),
            })?;

        let now = Utc::now().naive_utc();
        Ok(AdvanceOutcome::Advanced(WorkUnit {
            unit_id: Uuid::new_v4().to_string(),
            chain_id: unit.chain_id.clone(),
            step_order: successor.step_order,
            department_id: successor.department_id.clone(),
            assignee_id: assignee.member_id.clone(),
            status: WorkUnitStatus::Pending,
            created_at: now,
            updated_at: now,
        }))
    }
}
