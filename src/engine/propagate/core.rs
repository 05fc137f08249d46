// ==========================================
// 完成传播引擎 - 核心实现
// ==========================================
// 规则 R1 (日→周): 周内全部工作日完成 ⇔ 周完成
// 规则 R2 (周→日): 显式切换周时, 周内全部工作日同向切换
// 要求性质: R2 之后紧跟 R1 必须为无操作 (tests 断言)
// ==========================================

use crate::domain::completion::{CompletionLedger, LedgerMutation};
use crate::domain::kpi::KpiTarget;
use crate::domain::types::TargetRef;
use crate::engine::error::{EngineError, EngineResult};
use tracing::instrument;

// ==========================================
// CompletionPropagator - 完成传播引擎
// ==========================================
pub struct CompletionPropagator {
    // 无状态引擎
}

impl Default for CompletionPropagator {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionPropagator {
    pub fn new() -> Self {
        Self {}
    }

    /// R1: 某日完成状态变化后, 重新派生所在周的完成状态
    ///
    /// - 全部工作日已完成且周未标记 → 标记周
    /// - 存在未完成工作日且周已标记 → 取消周标记
    /// - 无工作日的周永不物化台账行 (真空完成只存在于投影层)
    #[instrument(skip_all, fields(kpi_id = %kpi.kpi_id, week_index))]
    pub fn on_day_toggled(
        &self,
        kpi: &KpiTarget,
        ledger: &CompletionLedger,
        week_index: u32,
        actor: &str,
    ) -> EngineResult<Vec<LedgerMutation>> {
        let week = kpi
            .find_week(week_index)
            .ok_or(EngineError::WeekNotFound { week_index })?;

        if week.days.is_empty() {
            return Ok(Vec::new());
        }

        let week_ref = TargetRef::Week(week_index);
        let all_done = week.all_days_complete(ledger);
        let week_marked = ledger.is_complete(week_ref);

        let mut mutations = Vec::new();
        if all_done && !week_marked {
            mutations.push(LedgerMutation::Mark {
                target_ref: week_ref,
                recorded_by: actor.to_string(),
            });
        } else if !all_done && week_marked {
            mutations.push(LedgerMutation::Unmark {
                target_ref: week_ref,
            });
        }

        Ok(mutations)
    }

    /// R2: 显式切换周完成状态, 周内全部工作日同向切换
    ///
    /// 只对实际需要变化的单元产出指令 (标记本身幂等,
    /// 但最小指令集让台账事务与审计保持干净)
    #[instrument(skip_all, fields(kpi_id = %kpi.kpi_id, week_index, complete))]
    pub fn on_week_toggled(
        &self,
        kpi: &KpiTarget,
        ledger: &CompletionLedger,
        week_index: u32,
        complete: bool,
        actor: &str,
    ) -> EngineResult<Vec<LedgerMutation>> {
        let week = kpi
            .find_week(week_index)
            .ok_or(EngineError::WeekNotFound { week_index })?;

        if week.days.is_empty() {
            return Ok(Vec::new());
        }

        let week_ref = TargetRef::Week(week_index);
        let mut mutations = Vec::new();

        if complete {
            for day in &week.days {
                let day_ref = TargetRef::Day(day.date);
                if !ledger.is_complete(day_ref) {
                    mutations.push(LedgerMutation::Mark {
                        target_ref: day_ref,
                        recorded_by: actor.to_string(),
                    });
                }
            }
            if !ledger.is_complete(week_ref) {
                mutations.push(LedgerMutation::Mark {
                    target_ref: week_ref,
                    recorded_by: actor.to_string(),
                });
            }
        } else {
            for day in &week.days {
                let day_ref = TargetRef::Day(day.date);
                if ledger.is_complete(day_ref) {
                    mutations.push(LedgerMutation::Unmark {
                        target_ref: day_ref,
                    });
                }
            }
            if ledger.is_complete(week_ref) {
                mutations.push(LedgerMutation::Unmark {
                    target_ref: week_ref,
                });
            }
        }

        Ok(mutations)
    }
}
