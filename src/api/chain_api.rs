// ==========================================
// 生产链KPI引擎 - 生产链业务接口
// ==========================================
// 职责: 工作单元推进 + 步骤维护 (锁定谓词守门)
// 红线: 步骤锁定是对台账的谓词查询, 不是链上的存储标志
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::chain::{validate_steps, ChainStep, WorkUnit};
use crate::domain::types::WorkUnitStatus;
use crate::engine::{AdvanceOutcome, ChainStepSequencer};
use crate::repository::{ChainStepRepository, CompletionRecordRepository, WorkUnitRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};

// ==========================================
// AdvanceResult - 推进结果视图
// ==========================================
#[derive(Debug, Clone)]
pub enum AdvanceResult {
    /// 新工作单元已在后继部门创建
    Advanced(WorkUnit),
    /// 本轮链流转完成, 无后继步骤
    ChainCompleted,
}

// ==========================================
// ChainApi - 生产链业务接口
// ==========================================
pub struct ChainApi {
    step_repo: Arc<ChainStepRepository>,
    unit_repo: Arc<WorkUnitRepository>,
    completion_repo: Arc<CompletionRecordRepository>,
    sequencer: ChainStepSequencer,
}

impl ChainApi {
    /// 从共享连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            step_repo: Arc::new(ChainStepRepository::from_connection(conn.clone())),
            unit_repo: Arc::new(WorkUnitRepository::from_connection(conn.clone())),
            completion_repo: Arc::new(CompletionRecordRepository::from_connection(conn)),
            sequencer: ChainStepSequencer::new(),
        }
    }

    /// 完成当前工作单元并推进到后继步骤
    ///
    /// NoAssignee 时不落任何变更 —— 当前单元保持原状态,
    /// 调用方修复部门成员后重试
    #[instrument(skip_all, fields(unit_id))]
    pub fn advance_work_unit(&self, unit_id: &str) -> ApiResult<AdvanceResult> {
        let unit = self
            .unit_repo
            .find_by_id(unit_id)?
            .ok_or_else(|| ApiError::NotFound(format!("work_unit id={}", unit_id)))?;

        // 只有 IN_PROGRESS 可推进: PENDING 须先领取, COMPLETED 不可重复推进
        if !unit.status.can_transition_to(WorkUnitStatus::Completed) {
            return Err(ApiError::InvalidStateTransition {
                from: unit.status.to_string(),
                to: WorkUnitStatus::Completed.to_string(),
            });
        }

        let steps = self.step_repo.list_steps(&unit.chain_id)?;
        let successor_dept = steps
            .iter()
            .find(|s| s.step_order == unit.step_order + 1)
            .map(|s| s.department_id.clone());

        let members = match &successor_dept {
            Some(dept) => self.step_repo.list_members(dept)?,
            None => Vec::new(),
        };

        let outcome = self.sequencer.advance(&steps, &unit, &members)?;

        // 推进计算通过后才落库: 当前单元完成 + 新单元创建
        self.unit_repo
            .update_status(unit_id, WorkUnitStatus::Completed)?;
        match outcome {
            AdvanceOutcome::Advanced(next) => {
                self.unit_repo.create(&next)?;
                info!(unit_id, next_unit = %next.unit_id, step_order = next.step_order, "工作单元已推进");
                Ok(AdvanceResult::Advanced(next))
            }
            AdvanceOutcome::ChainCompleted => {
                info!(unit_id, "链流转完成");
                Ok(AdvanceResult::ChainCompleted)
            }
        }
    }

    /// 领取工作单元 (PENDING → IN_PROGRESS)
    #[instrument(skip_all, fields(unit_id))]
    pub fn start_work_unit(&self, unit_id: &str) -> ApiResult<()> {
        let unit = self
            .unit_repo
            .find_by_id(unit_id)?
            .ok_or_else(|| ApiError::NotFound(format!("work_unit id={}", unit_id)))?;

        if !unit.status.can_transition_to(WorkUnitStatus::InProgress) {
            return Err(ApiError::InvalidStateTransition {
                from: unit.status.to_string(),
                to: WorkUnitStatus::InProgress.to_string(),
            });
        }
        self.unit_repo
            .update_status(unit_id, WorkUnitStatus::InProgress)?;
        Ok(())
    }

    /// 追加步骤 (锁定后仍允许追加, 但整链结构须保持合法)
    #[instrument(skip_all, fields(chain_id = %step.chain_id, step_order = step.step_order))]
    pub fn add_step(&self, step: ChainStep) -> ApiResult<()> {
        let mut steps = self.step_repo.list_steps(&step.chain_id)?;
        steps.push(step.clone());
        validate_steps(&steps).map_err(ApiError::InvalidInput)?;
        self.step_repo.create_step(&step)?;
        Ok(())
    }

    /// 修改步骤标题 (锁定后唯一允许的就地编辑)
    pub fn rename_step(&self, chain_id: &str, step_order: u32, title: &str) -> ApiResult<()> {
        self.step_repo.update_step_title(chain_id, step_order, title)?;
        Ok(())
    }

    /// 变更步骤承接部门 (链锁定后拒绝)
    #[instrument(skip_all, fields(chain_id, step_order))]
    pub fn change_step_department(
        &self,
        chain_id: &str,
        step_order: u32,
        department_id: &str,
    ) -> ApiResult<()> {
        if self.steps_locked(chain_id)? {
            return Err(ApiError::ChainStepsLocked {
                chain_id: chain_id.to_string(),
            });
        }

        let mut steps = self.step_repo.list_steps(chain_id)?;
        let step = steps
            .iter_mut()
            .find(|s| s.step_order == step_order)
            .ok_or_else(|| {
                ApiError::NotFound(format!("chain_step id={}#{}", chain_id, step_order))
            })?;
        step.department_id = department_id.to_string();
        validate_steps(&steps).map_err(ApiError::InvalidInput)?;

        self.step_repo
            .update_step_department(chain_id, step_order, department_id)?;
        Ok(())
    }

    /// 步骤锁定谓词: 链下任一KPI存在完成记录即锁定
    pub fn steps_locked(&self, chain_id: &str) -> ApiResult<bool> {
        Ok(self.completion_repo.exists_any_for_chain(chain_id)?)
    }
}
