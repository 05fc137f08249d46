// ==========================================
// 生产链KPI引擎 - 引擎策略配置
// ==========================================
// 职责: 显式落定的策略开关 (含原系统中悬而未决的分支)
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// EngineConfig - 引擎策略配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 无工作日的周是否按真空完成投影
    /// (投影层策略; 此类周永不物化台账行)
    pub vacuous_week_autocomplete: bool,
    /// 系统派生的台账写入 (如周级联动标记) 缺省记录人
    pub default_recorded_by: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vacuous_week_autocomplete: true,
            default_recorded_by: "system".to_string(),
        }
    }
}
