//! 排程建議與批次依賴模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 前置工序提前期較長的警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingDependency {
    /// 前置工序代碼
    pub stage_code: String,

    /// 前置工序依相同交期推得的建議日期
    pub suggested_date: NaiveDate,

    /// 前置工序提前期（天）
    pub lead_time_days: u32,
}

/// 排程建議（僅供參考，不會寫回）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSuggestion {
    /// 批次ID
    pub batch_id: String,

    /// 工序代碼
    pub stage_code: String,

    /// 目前已知的排定日期
    pub current_date: Option<NaiveDate>,

    /// 建議生產日期
    pub suggested_date: NaiveDate,

    /// 使用的提前期（天）
    pub lead_time_days: u32,

    /// 說明
    pub reason: String,

    /// 前置工序代碼
    pub dependencies: Vec<String>,

    /// 提前期較長的前置工序
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_dependencies: Option<Vec<MissingDependency>>,
}

impl ScheduleSuggestion {
    /// 是否帶有前置工序警告
    pub fn has_warnings(&self) -> bool {
        self.missing_dependencies
            .as_ref()
            .is_some_and(|missing| !missing.is_empty())
    }

    /// 建議日期與目前日期不同
    pub fn is_change(&self) -> bool {
        self.current_date != Some(self.suggested_date)
    }
}

/// 批次之間的依賴邊（前置批次 → 後續批次）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    /// 前置批次ID
    pub from: String,

    /// 後續批次ID
    pub to: String,

    pub from_stage: String,
    pub to_stage: String,

    /// 後續批次已排定，但前置批次未排定或排得更晚
    pub missing: bool,
}
