// ==========================================
// 配额再分配引擎 - 核心实现
// ==========================================
// (a) set_day_target: 单日覆写, 周目标随日合计变化 (不全局回平 I1)
// (b) set_week_target: 新值摊到周内开放日, 锁定日/缺勤日原值不动
// (c) redistribute_remainder: 重新申报总配额, 未完成余量摊到全部开放日
// 均分规则与日历分区引擎共用 split_evenly, 两处算法不允许漂移
// ==========================================

use crate::domain::completion::CompletionLedger;
use crate::domain::kpi::KpiTarget;
use crate::domain::types::TargetRef;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::partition::split_evenly;
use chrono::NaiveDate;
use tracing::instrument;

// ==========================================
// RedistributionEngine - 配额再分配引擎
// ==========================================
pub struct RedistributionEngine {
    // 无状态引擎
}

impl Default for RedistributionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RedistributionEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// (a) 覆写单日目标值
    ///
    /// 已完成的日与缺勤日均拒绝编辑; 父周目标重算为日合计 (I2 自动保持);
    /// 总配额 I1 不自动回平 —— 日级编辑是用户显式覆写, 全局对齐
    /// 由 redistribute_remainder 负责
    #[instrument(skip_all, fields(kpi_id = %kpi.kpi_id, %date, new_value))]
    pub fn set_day_target(
        &self,
        kpi: &mut KpiTarget,
        ledger: &CompletionLedger,
        date: NaiveDate,
        new_value: i64,
    ) -> EngineResult<()> {
        if new_value < 0 {
            return Err(EngineError::InvalidQuantity { value: new_value });
        }

        let week_index = kpi
            .week_index_of_day(date)
            .ok_or(EngineError::DayNotFound { date })?;

        if ledger.is_complete(TargetRef::Day(date)) {
            let current = kpi.find_day(date).map(|d| d.target_value).unwrap_or(0);
            return Err(EngineError::LockedUnit {
                message: format!("{} 已完成 (当前值{}), 不可改为{}", date, current, new_value),
            });
        }

        let week = kpi
            .find_week_mut(week_index)
            .ok_or(EngineError::WeekNotFound { week_index })?;
        let day = week
            .find_day_mut(date)
            .ok_or(EngineError::DayNotFound { date })?;
        // 缺勤日目标强制为0: 既不锁定也不开放的日不允许携带配额,
        // 否则 redistribute_remainder 的 locked_sum + 余量 账目不再覆盖全树
        if !day.is_attending {
            return Err(EngineError::LockedUnit {
                message: format!(
                    "{} 为缺勤日, 日目标强制为0, 不可改为{}; 请先恢复出勤",
                    date, new_value
                ),
            });
        }
        day.target_value = new_value;
        week.target_value = week.sum_of_days();

        Ok(())
    }

    /// (b) 将新值摊到周内开放日 (出勤且未完成)
    ///
    /// new_value 是摊给开放日的量; 周目标最终为锁定日合计 + new_value
    /// (即重算后的日合计); 周内无开放日时拒绝
    #[instrument(skip_all, fields(kpi_id = %kpi.kpi_id, week_index, new_value))]
    pub fn set_week_target(
        &self,
        kpi: &mut KpiTarget,
        ledger: &CompletionLedger,
        week_index: u32,
        new_value: i64,
    ) -> EngineResult<()> {
        if new_value < 0 {
            return Err(EngineError::InvalidQuantity { value: new_value });
        }

        let week = kpi
            .find_week_mut(week_index)
            .ok_or(EngineError::WeekNotFound { week_index })?;

        let open_count = week.days.iter().filter(|d| d.is_open(ledger)).count();
        if open_count == 0 {
            let locked_sum: i64 = week
                .days
                .iter()
                .filter(|d| ledger.is_complete(TargetRef::Day(d.date)))
                .map(|d| d.target_value)
                .sum();
            return Err(EngineError::LockedUnit {
                message: format!(
                    "第{}周已无可调整的开放日 (已完成合计{}), 不可摊入{}",
                    week_index, locked_sum, new_value
                ),
            });
        }

        let shares = split_evenly(new_value, open_count);
        let mut share_iter = shares.into_iter();
        for day in week.days.iter_mut().filter(|d| d.is_open(ledger)) {
            day.target_value = share_iter.next().unwrap_or(0);
        }
        week.target_value = week.sum_of_days();

        Ok(())
    }

    /// (c) 重新申报总配额, 未完成余量摊到全部开放日
    ///
    /// 流程: locked_sum → 余量校验 → 时间顺序摊分 → 周目标/总配额重算;
    /// 本操作是唯一在总配额变化后恢复 I1 的入口
    #[instrument(skip_all, fields(kpi_id = %kpi.kpi_id, new_total_value))]
    pub fn redistribute_remainder(
        &self,
        kpi: &mut KpiTarget,
        ledger: &CompletionLedger,
        new_total_value: i64,
    ) -> EngineResult<()> {
        if new_total_value < 0 {
            return Err(EngineError::InvalidQuantity {
                value: new_total_value,
            });
        }

        let locked_sum = kpi.locked_sum(ledger);
        let remaining = new_total_value - locked_sum;
        if remaining < 0 {
            return Err(EngineError::OverCommitted {
                requested: new_total_value,
                locked_sum,
            });
        }

        let open_count = kpi.iter_days().filter(|d| d.is_open(ledger)).count();
        if open_count == 0 && remaining > 0 {
            return Err(EngineError::LockedUnit {
                message: format!(
                    "已无开放日可吸收余量: 已完成{}, 余量{}",
                    locked_sum, remaining
                ),
            });
        }

        let shares = split_evenly(remaining, open_count);
        let mut share_iter = shares.into_iter();
        for week in &mut kpi.weeks {
            for day in week.days.iter_mut().filter(|d| d.is_open(ledger)) {
                day.target_value = share_iter.next().unwrap_or(0);
            }
            week.target_value = week.sum_of_days();
        }
        kpi.total_value = new_total_value;

        Ok(())
    }

    /// 出勤切换
    ///
    /// 置为缺勤时日目标清零并退出后续再分配;
    /// 恢复出勤只是重新进入开放日集合, 值保持0直到下一次再分配,
    /// 永不自行产生非零值
    #[instrument(skip_all, fields(kpi_id = %kpi.kpi_id, %date, attending))]
    pub fn set_attending(
        &self,
        kpi: &mut KpiTarget,
        ledger: &CompletionLedger,
        date: NaiveDate,
        attending: bool,
    ) -> EngineResult<()> {
        let week_index = kpi
            .week_index_of_day(date)
            .ok_or(EngineError::DayNotFound { date })?;

        if ledger.is_complete(TargetRef::Day(date)) {
            return Err(EngineError::LockedUnit {
                message: format!("{} 已完成, 不可变更出勤标记", date),
            });
        }

        let week = kpi
            .find_week_mut(week_index)
            .ok_or(EngineError::WeekNotFound { week_index })?;
        let day = week
            .find_day_mut(date)
            .ok_or(EngineError::DayNotFound { date })?;

        if day.is_attending == attending {
            return Ok(());
        }

        day.is_attending = attending;
        if !attending {
            day.target_value = 0;
        }
        week.target_value = week.sum_of_days();

        Ok(())
    }
}
