// ==========================================
// 生产链KPI引擎 - 领域类型定义
// ==========================================
// 职责: 完成记录键/工作单元状态等核心枚举
// 红线: 完成台账键必须有稳定的文本形式 (入库/审计用)
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// CompletionKind - 完成记录种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionKind {
    /// 周级完成
    Week,
    /// 日级完成
    Day,
}

impl CompletionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionKind::Week => "WEEK",
            CompletionKind::Day => "DAY",
        }
    }

    /// 从数据库文本解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "WEEK" => Some(CompletionKind::Week),
            "DAY" => Some(CompletionKind::Day),
            _ => None,
        }
    }
}

impl fmt::Display for CompletionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// TargetRef - 完成记录目标引用
// ==========================================
// 周按序号引用, 日按日期引用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    Week(u32),
    Day(NaiveDate),
}

impl TargetRef {
    /// 对应的记录种类
    pub fn kind(&self) -> CompletionKind {
        match self {
            TargetRef::Week(_) => CompletionKind::Week,
            TargetRef::Day(_) => CompletionKind::Day,
        }
    }

    /// 稳定的入库文本形式: "week:3" / "day:2024-05-06"
    pub fn as_db_string(&self) -> String {
        match self {
            TargetRef::Week(idx) => format!("week:{}", idx),
            TargetRef::Day(date) => format!("day:{}", date.format("%Y-%m-%d")),
        }
    }

    /// 从入库文本解析
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(idx) = s.strip_prefix("week:") {
            return idx.parse::<u32>().ok().map(TargetRef::Week);
        }
        if let Some(date) = s.strip_prefix("day:") {
            return NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .map(TargetRef::Day);
        }
        None
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_db_string())
    }
}

// ==========================================
// WorkUnitStatus - 工作单元状态
// ==========================================
// 状态机: PENDING → IN_PROGRESS → COMPLETED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkUnitStatus {
    Pending,
    InProgress,
    Completed,
}

impl WorkUnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkUnitStatus::Pending => "PENDING",
            WorkUnitStatus::InProgress => "IN_PROGRESS",
            WorkUnitStatus::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(WorkUnitStatus::Pending),
            "IN_PROGRESS" => Some(WorkUnitStatus::InProgress),
            "COMPLETED" => Some(WorkUnitStatus::Completed),
            _ => None,
        }
    }

    /// 状态转换合法性 (只允许前进)
    pub fn can_transition_to(&self, next: WorkUnitStatus) -> bool {
        matches!(
            (self, next),
            (WorkUnitStatus::Pending, WorkUnitStatus::InProgress)
                | (WorkUnitStatus::InProgress, WorkUnitStatus::Completed)
        )
    }
}

impl fmt::Display for WorkUnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 工作日判定 (周一至周五)
pub fn is_working_day(date: NaiveDate) -> bool {
    use chrono::Datelike;
    date.weekday().num_days_from_monday() < 5
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_target_ref_roundtrip() {
        let week = TargetRef::Week(3);
        assert_eq!(week.as_db_string(), "week:3");
        assert_eq!(TargetRef::parse("week:3"), Some(week));

        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let day = TargetRef::Day(date);
        assert_eq!(day.as_db_string(), "day:2024-05-06");
        assert_eq!(TargetRef::parse("day:2024-05-06"), Some(day));

        assert_eq!(TargetRef::parse("month:1"), None);
        assert_eq!(TargetRef::parse("day:invalid"), None);
    }

    #[test]
    fn test_work_unit_transitions() {
        assert!(WorkUnitStatus::Pending.can_transition_to(WorkUnitStatus::InProgress));
        assert!(WorkUnitStatus::InProgress.can_transition_to(WorkUnitStatus::Completed));
        assert!(!WorkUnitStatus::Completed.can_transition_to(WorkUnitStatus::Pending));
        assert!(!WorkUnitStatus::Pending.can_transition_to(WorkUnitStatus::Completed));
    }

    #[test]
    fn test_is_working_day() {
        // 2024-05-06 是周一
        assert!(is_working_day(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()));
        assert!(is_working_day(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()));
        // 周六/周日
        assert!(!is_working_day(NaiveDate::from_ymd_opt(2024, 5, 11).unwrap()));
        assert!(!is_working_day(NaiveDate::from_ymd_opt(2024, 5, 12).unwrap()));
    }
}
