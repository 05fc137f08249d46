// ==========================================
// 生产链KPI引擎 - KPI目标领域模型
// ==========================================
// 不变式 I1: sum(week.target_value) == total_value (任何成功变更后)
// 不变式 I2: sum(day.target_value) == week.target_value
// 红线: is_completed 是台账的读时投影, 实体上不冗余存储
// ==========================================

use crate::domain::completion::CompletionLedger;
use crate::domain::types::TargetRef;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// KpiTarget - 生产链KPI目标
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiTarget {
    pub kpi_id: String,            // KPI目标ID
    pub chain_id: String,          // 关联生产链
    pub total_value: i64,          // 总配额 (非负)
    pub start_date: NaiveDate,     // 周期起始 (含)
    pub end_date: NaiveDate,       // 周期结束 (含)
    pub weeks: Vec<Week>,          // 周拆分 (由分区器重建, 之后原地变更)
    pub revision: i32,             // 乐观锁: 修订号
    pub created_at: NaiveDateTime, // 创建时间
    pub updated_at: NaiveDateTime, // 更新时间
}

// ==========================================
// Week - 周目标
// ==========================================
// 周一对齐的自然周与KPI周期的交集, 周界处可短于7天
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Week {
    pub week_index: u32,       // 周序号 (周期内1起, 分配后稳定)
    pub start_date: NaiveDate, // 展示子区间起始
    pub end_date: NaiveDate,   // 展示子区间结束
    pub target_value: i64,     // 周目标值
    pub is_completed: bool,    // 完成投影 (台账为准)
    pub days: Vec<Day>,        // 工作日 (周一至周五, 周末不物化)
}

// ==========================================
// Day - 日目标
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Day {
    pub date: NaiveDate,    // 日期 (周内唯一)
    pub target_value: i64,  // 日目标值
    pub is_completed: bool, // 完成投影 (台账为准)
    pub is_attending: bool, // 出勤标记: false 时强制为0且不参与再分配
}

impl Day {
    /// 是否为可再分配的开放日 (出勤且未完成)
    pub fn is_open(&self, ledger: &CompletionLedger) -> bool {
        self.is_attending && !ledger.is_complete(TargetRef::Day(self.date))
    }
}

impl Week {
    /// 周内日目标合计
    pub fn sum_of_days(&self) -> i64 {
        self.days.iter().map(|d| d.target_value).sum()
    }

    /// 周内所有工作日是否均已完成 (空周为真空真)
    pub fn all_days_complete(&self, ledger: &CompletionLedger) -> bool {
        self.days
            .iter()
            .all(|d| ledger.is_complete(TargetRef::Day(d.date)))
    }

    pub fn find_day(&self, date: NaiveDate) -> Option<&Day> {
        self.days.iter().find(|d| d.date == date)
    }

    pub fn find_day_mut(&mut self, date: NaiveDate) -> Option<&mut Day> {
        self.days.iter_mut().find(|d| d.date == date)
    }
}

impl KpiTarget {
    /// 周目标合计 (不变式 I1 校验用)
    pub fn sum_of_weeks(&self) -> i64 {
        self.weeks.iter().map(|w| w.target_value).sum()
    }

    pub fn find_week(&self, week_index: u32) -> Option<&Week> {
        self.weeks.iter().find(|w| w.week_index == week_index)
    }

    pub fn find_week_mut(&mut self, week_index: u32) -> Option<&mut Week> {
        self.weeks.iter_mut().find(|w| w.week_index == week_index)
    }

    /// 按日期定位日目标
    pub fn find_day(&self, date: NaiveDate) -> Option<&Day> {
        self.weeks.iter().find_map(|w| w.find_day(date))
    }

    /// 按日期定位日目标所在周的序号
    pub fn week_index_of_day(&self, date: NaiveDate) -> Option<u32> {
        self.weeks
            .iter()
            .find(|w| w.find_day(date).is_some())
            .map(|w| w.week_index)
    }

    /// 全部工作日的时间顺序迭代
    pub fn iter_days(&self) -> impl Iterator<Item = &Day> {
        self.weeks.iter().flat_map(|w| w.days.iter())
    }

    /// 已完成日的目标值合计 (已锁定数量)
    pub fn locked_sum(&self, ledger: &CompletionLedger) -> i64 {
        self.iter_days()
            .filter(|d| ledger.is_complete(TargetRef::Day(d.date)))
            .map(|d| d.target_value)
            .sum()
    }

    /// 工作日总数
    pub fn working_day_count(&self) -> usize {
        self.weeks.iter().map(|w| w.days.len()).sum()
    }

    /// 刷新完成投影 (台账为唯一事实来源)
    ///
    /// 无工作日的周按真空完成投影 (vacuous_complete 策略开关),
    /// 但永不依赖台账中的周记录行
    pub fn project_completion(&mut self, ledger: &CompletionLedger, vacuous_complete: bool) {
        for week in &mut self.weeks {
            for day in &mut week.days {
                day.is_completed = ledger.is_complete(TargetRef::Day(day.date));
            }
            week.is_completed = if week.days.is_empty() {
                vacuous_complete
            } else {
                ledger.is_complete(TargetRef::Week(week.week_index))
            };
        }
    }
}
