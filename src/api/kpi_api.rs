// ==========================================
// 生产链KPI引擎 - KPI目标业务接口
// ==========================================
// 职责: 对Web层暴露边界操作, 组织 读快照→纯引擎计算→原子落库 的流水
// 红线: 台账变更与目标树变更各自单事务, 读取方只见一致的 (日,周) 组合
// 红线: 完成投影在每次返回前按台账刷新, 不落在实体上
// ==========================================

use crate::config::EngineConfig;
use crate::domain::completion::{CompletionLedger, LedgerMutation};
use crate::domain::kpi::KpiTarget;
use crate::domain::types::TargetRef;
use crate::engine::{CalendarPartitioner, CompletionPropagator, RedistributionEngine};
use crate::api::error::{ApiError, ApiResult};
use crate::repository::{CompletionRecordRepository, KpiTargetRepository};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument};
use uuid::Uuid;

// ==========================================
// 视图类型 - 返回给Web层的投影
// ==========================================

#[derive(Debug, Clone, Serialize)]
pub struct KpiTargetView {
    pub kpi_id: String,
    pub chain_id: String,
    pub total_value: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revision: i32,
    pub weeks: Vec<WeekView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeekView {
    pub week_index: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target_value: i64,
    pub is_completed: bool,
    pub completed_day_count: usize,
    pub days: Vec<DayView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub target_value: i64,
    pub is_completed: bool,
    pub is_attending: bool,
}

fn build_view(kpi: &KpiTarget) -> KpiTargetView {
    KpiTargetView {
        kpi_id: kpi.kpi_id.clone(),
        chain_id: kpi.chain_id.clone(),
        total_value: kpi.total_value,
        start_date: kpi.start_date,
        end_date: kpi.end_date,
        revision: kpi.revision,
        weeks: kpi
            .weeks
            .iter()
            .map(|w| WeekView {
                week_index: w.week_index,
                start_date: w.start_date,
                end_date: w.end_date,
                target_value: w.target_value,
                is_completed: w.is_completed,
                completed_day_count: w.days.iter().filter(|d| d.is_completed).count(),
                days: w
                    .days
                    .iter()
                    .map(|d| DayView {
                        date: d.date,
                        target_value: d.target_value,
                        is_completed: d.is_completed,
                        is_attending: d.is_attending,
                    })
                    .collect(),
            })
            .collect(),
    }
}

// ==========================================
// KpiApi - KPI目标业务接口
// ==========================================
pub struct KpiApi {
    kpi_repo: Arc<KpiTargetRepository>,
    completion_repo: Arc<CompletionRecordRepository>,
    partitioner: CalendarPartitioner,
    redistribution: RedistributionEngine,
    propagator: CompletionPropagator,
    config: EngineConfig,
}

impl KpiApi {
    /// 从共享连接创建 (仓储挂同一连接, 保证单写者串行化)
    pub fn from_connection(conn: Arc<Mutex<Connection>>, config: EngineConfig) -> Self {
        Self {
            kpi_repo: Arc::new(KpiTargetRepository::from_connection(conn.clone())),
            completion_repo: Arc::new(CompletionRecordRepository::from_connection(conn)),
            partitioner: CalendarPartitioner::new(),
            redistribution: RedistributionEngine::new(),
            propagator: CompletionPropagator::new(),
            config,
        }
    }

    // ==========================================
    // 创建与查询
    // ==========================================

    /// 创建KPI目标: 分区并整树落库
    ///
    /// 周期重叠校验由链管理协作方在调用前完成
    #[instrument(skip_all, fields(chain_id, total_value, %start_date, %end_date))]
    pub fn create_kpi_target(
        &self,
        chain_id: &str,
        total_value: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> ApiResult<KpiTargetView> {
        let weeks = self
            .partitioner
            .partition(total_value, start_date, end_date)?;

        let working_days: usize = weeks.iter().map(|w| w.days.len()).sum();
        if working_days == 0 {
            return Err(ApiError::InvalidInput(format!(
                "周期 {} ~ {} 不包含任何工作日, 无法分配配额{}",
                start_date, end_date, total_value
            )));
        }

        let now = Utc::now().naive_utc();
        let mut kpi = KpiTarget {
            kpi_id: Uuid::new_v4().to_string(),
            chain_id: chain_id.to_string(),
            total_value,
            start_date,
            end_date,
            weeks,
            revision: 0,
            created_at: now,
            updated_at: now,
        };
        self.kpi_repo.create(&kpi)?;
        info!(kpi_id = %kpi.kpi_id, working_days, "KPI目标已创建");

        kpi.project_completion(
            &CompletionLedger::new(),
            self.config.vacuous_week_autocomplete,
        );
        Ok(build_view(&kpi))
    }

    /// 读取KPI目标 (含按台账实时投影的完成标记)
    pub fn get_kpi_target(&self, kpi_id: &str) -> ApiResult<KpiTargetView> {
        let (mut kpi, ledger) = self.load(kpi_id)?;
        kpi.project_completion(&ledger, self.config.vacuous_week_autocomplete);
        Ok(build_view(&kpi))
    }

    // ==========================================
    // 配额再分配
    // ==========================================

    /// 重新申报总配额 (再分配操作c, 唯一全局恢复 I1 的入口)
    #[instrument(skip_all, fields(kpi_id, new_total_value))]
    pub fn update_total_value(&self, kpi_id: &str, new_total_value: i64) -> ApiResult<KpiTargetView> {
        let (mut kpi, ledger) = self.load(kpi_id)?;
        self.redistribution
            .redistribute_remainder(&mut kpi, &ledger, new_total_value)?;
        self.persist_tree(&mut kpi)?;
        kpi.project_completion(&ledger, self.config.vacuous_week_autocomplete);
        Ok(build_view(&kpi))
    }

    /// 调整周目标 (再分配操作b, 只摊给周内开放日)
    #[instrument(skip_all, fields(kpi_id, week_index, new_value))]
    pub fn update_week_target(
        &self,
        kpi_id: &str,
        week_index: u32,
        new_value: i64,
    ) -> ApiResult<KpiTargetView> {
        let (mut kpi, ledger) = self.load(kpi_id)?;
        self.redistribution
            .set_week_target(&mut kpi, &ledger, week_index, new_value)?;
        self.persist_tree(&mut kpi)?;
        kpi.project_completion(&ledger, self.config.vacuous_week_autocomplete);
        Ok(build_view(&kpi))
    }

    /// 覆写日目标 (再分配操作a, 用户显式覆写, 不全局回平)
    #[instrument(skip_all, fields(kpi_id, %date, new_value))]
    pub fn update_day_target(
        &self,
        kpi_id: &str,
        date: NaiveDate,
        new_value: i64,
    ) -> ApiResult<KpiTargetView> {
        let (mut kpi, ledger) = self.load(kpi_id)?;
        self.redistribution
            .set_day_target(&mut kpi, &ledger, date, new_value)?;
        self.persist_tree(&mut kpi)?;
        kpi.project_completion(&ledger, self.config.vacuous_week_autocomplete);
        Ok(build_view(&kpi))
    }

    /// 出勤切换
    #[instrument(skip_all, fields(kpi_id, %date, attending))]
    pub fn set_day_attending(
        &self,
        kpi_id: &str,
        date: NaiveDate,
        attending: bool,
    ) -> ApiResult<KpiTargetView> {
        let (mut kpi, ledger) = self.load(kpi_id)?;
        self.redistribution
            .set_attending(&mut kpi, &ledger, date, attending)?;
        self.persist_tree(&mut kpi)?;
        kpi.project_completion(&ledger, self.config.vacuous_week_autocomplete);
        Ok(build_view(&kpi))
    }

    // ==========================================
    // 完成切换 (台账 + 传播引擎)
    // ==========================================

    /// 切换单日完成状态
    ///
    /// 切换指令与传播指令 (R1) 合并后单事务落库,
    /// 调用方只会观察到一致的 (日,周) 组合
    #[instrument(skip_all, fields(kpi_id, %date, actor))]
    pub fn toggle_day_completion(
        &self,
        kpi_id: &str,
        date: NaiveDate,
        actor: &str,
    ) -> ApiResult<KpiTargetView> {
        let (mut kpi, mut ledger) = self.load(kpi_id)?;
        let week_index = kpi
            .week_index_of_day(date)
            .ok_or_else(|| ApiError::NotFound(format!("日不存在: date={}", date)))?;

        let day_ref = TargetRef::Day(date);
        let toggle = if ledger.is_complete(day_ref) {
            LedgerMutation::Unmark {
                target_ref: day_ref,
            }
        } else {
            LedgerMutation::Mark {
                target_ref: day_ref,
                recorded_by: actor.to_string(),
            }
        };
        ledger.apply(&toggle, Utc::now().naive_utc());

        // R1 派生的周级标记按系统记录人落账, 与用户的日级标记在审计上可区分
        let mut mutations = vec![toggle];
        mutations.extend(self.propagator.on_day_toggled(
            &kpi,
            &ledger,
            week_index,
            &self.config.default_recorded_by,
        )?);
        for m in &mutations[1..] {
            ledger.apply(m, Utc::now().naive_utc());
        }

        self.completion_repo.apply_mutations(kpi_id, &mutations)?;
        // 台账落账推进了修订号, 视图同步 (客户端持此修订号继续PATCH)
        kpi.revision += 1;
        info!(kpi_id, %date, mutation_count = mutations.len(), "日完成切换已落账");

        kpi.project_completion(&ledger, self.config.vacuous_week_autocomplete);
        Ok(build_view(&kpi))
    }

    /// 切换整周完成状态 (R2: 周内工作日同向切换)
    #[instrument(skip_all, fields(kpi_id, week_index, actor))]
    pub fn toggle_week_completion(
        &self,
        kpi_id: &str,
        week_index: u32,
        actor: &str,
    ) -> ApiResult<KpiTargetView> {
        let (mut kpi, mut ledger) = self.load(kpi_id)?;
        let week = kpi
            .find_week(week_index)
            .ok_or_else(|| ApiError::NotFound(format!("周不存在: week_index={}", week_index)))?;
        if week.days.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "第{}周无工作日, 完成状态按真空投影, 不可显式切换",
                week_index
            )));
        }

        let complete = !ledger.is_complete(TargetRef::Week(week_index));
        let mutations = self
            .propagator
            .on_week_toggled(&kpi, &ledger, week_index, complete, actor)?;

        self.completion_repo.apply_mutations(kpi_id, &mutations)?;
        if !mutations.is_empty() {
            kpi.revision += 1;
        }
        let now = Utc::now().naive_utc();
        for m in &mutations {
            ledger.apply(m, now);
        }
        info!(kpi_id, week_index, complete, mutation_count = mutations.len(), "周完成切换已落账");

        kpi.project_completion(&ledger, self.config.vacuous_week_autocomplete);
        Ok(build_view(&kpi))
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 加载目标树与台账快照 (同一连接串行化, 二者来自一致时点)
    fn load(&self, kpi_id: &str) -> ApiResult<(KpiTarget, CompletionLedger)> {
        let kpi = self
            .kpi_repo
            .find_by_id(kpi_id)?
            .ok_or_else(|| ApiError::NotFound(format!("kpi_target id={}", kpi_id)))?;
        let ledger = self.completion_repo.load_ledger(kpi_id)?;
        Ok((kpi, ledger))
    }

    /// 整树落库并回写修订号 (乐观锁冲突时由调用方重试)
    fn persist_tree(&self, kpi: &mut KpiTarget) -> ApiResult<()> {
        let new_revision = self.kpi_repo.save_tree(kpi)?;
        kpi.revision = new_revision;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    // 视图是Web层的线上契约, 字段名不可漂移
    #[test]
    fn test_view_serializes_with_stable_field_names() {
        let now = Utc::now().naive_utc();
        let weeks = CalendarPartitioner::new()
            .partition(
                5,
                NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            )
            .unwrap();
        let kpi = KpiTarget {
            kpi_id: "KPI1".to_string(),
            chain_id: "CHAIN1".to_string(),
            total_value: 5,
            start_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            weeks,
            revision: 0,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(build_view(&kpi)).unwrap();
        assert_eq!(json["total_value"], 5);
        assert_eq!(json["weeks"][0]["week_index"], 1);
        assert_eq!(json["weeks"][0]["days"][0]["is_attending"], true);
        assert_eq!(json["weeks"][0]["completed_day_count"], 0);
    }
}
