// ==========================================
// 生产链KPI引擎 - 完成台账领域模型
// ==========================================
// 红线: 台账是"已锁定数量"的唯一事实来源
// 红线: 同一 (kind, target_ref) 至多一条有效记录
// ==========================================
// 职责: 完成记录 + 内存台账快照 + 台账变更指令
// 持久化由 repository::completion_repo 负责
// ==========================================

use crate::domain::types::{CompletionKind, TargetRef};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// CompletionRecord - 完成记录
// ==========================================
// 设计说明: 完成状态以记录行存在与否表达, 而非实体上的布尔字段,
// 以保留审计信息 (recorded_by / recorded_at) 并避免双写
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub kind: CompletionKind,
    pub target_ref: TargetRef,
    pub recorded_by: String,
    pub recorded_at: NaiveDateTime,
}

// ==========================================
// LedgerMutation - 台账变更指令
// ==========================================
// 传播引擎的输出词汇: 纯函数产出指令, 由调用方原子应用
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerMutation {
    Mark {
        target_ref: TargetRef,
        recorded_by: String,
    },
    Unmark {
        target_ref: TargetRef,
    },
}

impl LedgerMutation {
    pub fn target_ref(&self) -> TargetRef {
        match self {
            LedgerMutation::Mark { target_ref, .. } => *target_ref,
            LedgerMutation::Unmark { target_ref } => *target_ref,
        }
    }
}

// ==========================================
// CompletionLedger - 内存台账快照
// ==========================================
/// 完成台账快照
/// 职责: 一个KPI目标的全部完成记录的内存视图, 供引擎层纯函数查询;
/// mark 幂等, unmark 对不存在的记录为无操作
#[derive(Debug, Clone, Default)]
pub struct CompletionLedger {
    records: HashMap<TargetRef, CompletionRecord>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从已加载的记录列表构建快照
    pub fn from_records(records: Vec<CompletionRecord>) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.records.insert(record.target_ref, record);
        }
        ledger
    }

    /// 标记完成 (幂等: 已存在时保留原记录, 不报错)
    pub fn mark(&mut self, target_ref: TargetRef, recorded_by: &str, recorded_at: NaiveDateTime) {
        self.records.entry(target_ref).or_insert(CompletionRecord {
            kind: target_ref.kind(),
            target_ref,
            recorded_by: recorded_by.to_string(),
            recorded_at,
        });
    }

    /// 取消标记 (不存在时为无操作)
    pub fn unmark(&mut self, target_ref: TargetRef) {
        self.records.remove(&target_ref);
    }

    /// 查询完成状态
    pub fn is_complete(&self, target_ref: TargetRef) -> bool {
        self.records.contains_key(&target_ref)
    }

    /// 应用一条变更指令
    pub fn apply(&mut self, mutation: &LedgerMutation, recorded_at: NaiveDateTime) {
        match mutation {
            LedgerMutation::Mark {
                target_ref,
                recorded_by,
            } => self.mark(*target_ref, recorded_by, recorded_at),
            LedgerMutation::Unmark { target_ref } => self.unmark(*target_ref),
        }
    }

    /// 全部有效记录
    pub fn records(&self) -> impl Iterator<Item = &CompletionRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
