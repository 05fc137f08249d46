// ==========================================
// 生产链KPI引擎 - 日历分区引擎
// ==========================================
// 红线: 各级合计必须精确 (I1/I2), 不允许四舍五入误差
// ==========================================
// 职责: 将日期范围切分为周/工作日树, 并完成初始均分
// 输入: 总配额 + 周期 [start_date, end_date] (含两端)
// 输出: 周序列 (周目标 = 日目标之和)
// ==========================================

use crate::domain::kpi::{Day, Week};
use crate::domain::types::is_working_day;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Datelike, Duration, NaiveDate};
use tracing::instrument;

// ==========================================
// CalendarPartitioner - 日历分区引擎
// ==========================================
pub struct CalendarPartitioner {
    // 无状态引擎
}

impl Default for CalendarPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarPartitioner {
    pub fn new() -> Self {
        Self {}
    }

    /// 分区: 周一对齐的自然周 × 周期交集, 仅物化工作日
    ///
    /// 分配规则: base = total / n, remainder = total % n,
    /// 时间顺序上前 remainder 个工作日得 base+1, 其余得 base,
    /// 保证精确重构且日间最大差值为1
    ///
    /// # 返回
    /// - Ok(weeks): 周序列; 周期内无工作日时各周 days 为空且目标为0,
    ///   由调用方拒绝 (分区器本身不报错)
    /// - Err(InvalidRange): start_date > end_date
    /// - Err(InvalidQuantity): total_value < 0
    #[instrument(skip_all, fields(total_value, %start_date, %end_date))]
    pub fn partition(
        &self,
        total_value: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> EngineResult<Vec<Week>> {
        if start_date > end_date {
            return Err(EngineError::InvalidRange {
                start: start_date,
                end: end_date,
            });
        }
        if total_value < 0 {
            return Err(EngineError::InvalidQuantity { value: total_value });
        }

        let mut weeks = self.build_week_skeleton(start_date, end_date);

        let working_day_count: usize = weeks.iter().map(|w| w.days.len()).sum();
        if working_day_count == 0 {
            return Ok(weeks);
        }

        let shares = split_evenly(total_value, working_day_count);
        let mut share_iter = shares.into_iter();
        for week in &mut weeks {
            for day in &mut week.days {
                day.target_value = share_iter.next().unwrap_or(0);
            }
            // 周目标取日合计, 不做第二次均分 (I2 精确)
            week.target_value = week.sum_of_days();
        }

        Ok(weeks)
    }

    /// 构建周/日骨架 (目标值均为0)
    fn build_week_skeleton(&self, start_date: NaiveDate, end_date: NaiveDate) -> Vec<Week> {
        let mut weeks: Vec<Week> = Vec::new();

        // 首周的周一
        let mut week_start =
            start_date - Duration::days(start_date.weekday().num_days_from_monday() as i64);
        let mut week_index: u32 = 1;

        while week_start <= end_date {
            let week_end = week_start + Duration::days(6);
            let visible_start = week_start.max(start_date);
            let visible_end = week_end.min(end_date);

            let mut days = Vec::new();
            let mut date = visible_start;
            while date <= visible_end {
                if is_working_day(date) {
                    days.push(Day {
                        date,
                        target_value: 0,
                        is_completed: false,
                        is_attending: true,
                    });
                }
                date += Duration::days(1);
            }

            weeks.push(Week {
                week_index,
                start_date: visible_start,
                end_date: visible_end,
                target_value: 0,
                is_completed: false,
                days,
            });

            week_start = week_end + Duration::days(1);
            week_index += 1;
        }

        weeks
    }
}

/// 整除+余数的精确均分: 前 remainder 份得 base+1, 其余得 base
///
/// 分区与再分配共用同一实现, 避免两处算法漂移
pub fn split_evenly(total: i64, count: usize) -> Vec<i64> {
    if count == 0 {
        return Vec::new();
    }
    let n = count as i64;
    let base = total / n;
    let remainder = (total % n) as usize;

    (0..count)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}
