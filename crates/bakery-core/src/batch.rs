//! 生產批次模型（建議批次與已提交批次）

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::demand::{RecipeRole, TierDemand};

/// 批次狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Unscheduled,
    Scheduled,
    InProgress,
    Completed,
}

/// 批次的共同視圖（供依賴邊與狀態統計使用）
pub trait BatchView {
    /// 批次ID
    fn batch_id(&self) -> String;

    /// 工序代碼
    fn stage_code(&self) -> &str;

    /// 包含的需求單元ID（蛋糕層ID 與生產任務ID）
    fn unit_ids(&self) -> BTreeSet<&str>;

    /// 已排定日期
    fn scheduled_date(&self) -> Option<NaiveDate>;

    fn status(&self) -> BatchStatus;

    /// 最早交期
    fn earliest_due(&self) -> Option<NaiveDateTime>;
}

/// 庫存品生產任務對批次的貢獻
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockContribution {
    /// 生產任務ID
    pub task_id: String,

    /// 庫存品ID
    pub item_id: String,

    /// 庫存品名稱
    pub item_name: String,

    /// 目標數量
    pub target_quantity: Decimal,

    /// 每單位配方用量
    pub quantity_per_unit: Decimal,

    /// 配方總用量
    pub recipe_mass: Decimal,

    /// 預定日期（視為交期）
    pub due_at: Option<NaiveDateTime>,
}

/// 聚合後的建議批次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedBatch {
    /// 批次ID（工序代碼-配方名稱）
    pub id: String,

    /// 工序代碼
    pub stage_code: String,

    /// 配方名稱
    pub recipe_name: String,

    /// 配方角色（由第一個加入的需求決定）
    pub recipe_role: RecipeRole,

    /// 蛋糕層
    pub tiers: Vec<TierDemand>,

    /// 庫存品生產任務
    pub stock_items: Vec<StockContribution>,

    pub total_tiers: u32,
    pub total_servings: u32,
    pub total_surface_area: Decimal,
    pub total_frosting_mass: Decimal,
    pub total_stock_quantity: Decimal,

    /// 最早交期
    pub earliest_due_date: Option<NaiveDateTime>,

    /// 指派人員
    pub assigned_worker: Option<String>,

    /// 狀態（引擎只產生 Unscheduled）
    pub status: BatchStatus,

    /// 排定日期（由持久化層寫入）
    pub scheduled_date: Option<NaiveDate>,
}

impl AggregatedBatch {
    /// 批次鍵：工序代碼-配方名稱
    pub fn key(stage_code: &str, recipe_name: &str) -> String {
        format!("{}-{}", stage_code, recipe_name)
    }

    /// 創建空的建議批次
    pub fn new(
        id: impl Into<String>,
        stage_code: impl Into<String>,
        recipe_name: impl Into<String>,
        recipe_role: RecipeRole,
    ) -> Self {
        Self {
            id: id.into(),
            stage_code: stage_code.into(),
            recipe_name: recipe_name.into(),
            recipe_role,
            tiers: Vec::new(),
            stock_items: Vec::new(),
            total_tiers: 0,
            total_servings: 0,
            total_surface_area: Decimal::ZERO,
            total_frosting_mass: Decimal::ZERO,
            total_stock_quantity: Decimal::ZERO,
            earliest_due_date: None,
            assigned_worker: None,
            status: BatchStatus::Unscheduled,
            scheduled_date: None,
        }
    }

    /// 加入蛋糕層並累加統計
    pub fn add_tier(&mut self, tier: TierDemand) {
        self.total_tiers += 1;
        self.total_servings += tier.servings;
        self.total_surface_area += tier.surface_area;
        self.total_frosting_mass += tier.frosting_mass;
        self.merge_due(Some(tier.due_at));
        self.tiers.push(tier);
    }

    /// 加入庫存品貢獻並累加統計
    pub fn add_stock(&mut self, contribution: StockContribution) {
        self.total_stock_quantity += contribution.recipe_mass;
        self.merge_due(contribution.due_at);
        self.stock_items.push(contribution);
    }

    fn merge_due(&mut self, due: Option<NaiveDateTime>) {
        self.earliest_due_date = match (self.earliest_due_date, due) {
            (Some(current), Some(new)) => Some(current.min(new)),
            (current, new) => current.or(new),
        };
    }

    /// 只保留符合條件的需求單元，並重新計算統計
    pub fn retain_units<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let tiers = std::mem::take(&mut self.tiers);
        let stock_items = std::mem::take(&mut self.stock_items);

        self.total_tiers = 0;
        self.total_servings = 0;
        self.total_surface_area = Decimal::ZERO;
        self.total_frosting_mass = Decimal::ZERO;
        self.total_stock_quantity = Decimal::ZERO;
        self.earliest_due_date = None;

        for tier in tiers.into_iter().filter(|t| keep(t.tier_id.as_str())) {
            self.add_tier(tier);
        }
        for item in stock_items.into_iter().filter(|s| keep(s.task_id.as_str())) {
            self.add_stock(item);
        }
    }

    /// 沒有任何需求單元
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty() && self.stock_items.is_empty()
    }
}

impl BatchView for AggregatedBatch {
    fn batch_id(&self) -> String {
        self.id.clone()
    }

    fn stage_code(&self) -> &str {
        &self.stage_code
    }

    fn unit_ids(&self) -> BTreeSet<&str> {
        self.tiers
            .iter()
            .map(|t| t.tier_id.as_str())
            .chain(self.stock_items.iter().map(|s| s.task_id.as_str()))
            .collect()
    }

    fn scheduled_date(&self) -> Option<NaiveDate> {
        self.scheduled_date
    }

    fn status(&self) -> BatchStatus {
        self.status
    }

    fn earliest_due(&self) -> Option<NaiveDateTime> {
        self.earliest_due_date
    }
}

/// 已提交（持久化）的批次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedBatch {
    pub id: Uuid,
    pub stage_code: String,
    pub recipe_name: String,
    pub scheduled_date: NaiveDate,
    pub status: BatchStatus,
    pub assigned_worker: Option<String>,
    pub due_at: Option<NaiveDateTime>,
    pub tier_ids: BTreeSet<String>,
    pub stock_task_ids: BTreeSet<String>,
}

impl CommittedBatch {
    /// 創建已排定的批次
    pub fn new(
        stage_code: impl Into<String>,
        recipe_name: impl Into<String>,
        scheduled_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage_code: stage_code.into(),
            recipe_name: recipe_name.into(),
            scheduled_date,
            status: BatchStatus::Scheduled,
            assigned_worker: None,
            due_at: None,
            tier_ids: BTreeSet::new(),
            stock_task_ids: BTreeSet::new(),
        }
    }

    /// 建構器模式：設置狀態
    pub fn with_status(mut self, status: BatchStatus) -> Self {
        self.status = status;
        self
    }

    /// 建構器模式：設置指派人員
    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.assigned_worker = Some(worker.into());
        self
    }

    /// 建構器模式：設置交期
    pub fn with_due_at(mut self, due_at: NaiveDateTime) -> Self {
        self.due_at = Some(due_at);
        self
    }

    /// 建構器模式：添加蛋糕層
    pub fn with_tier(mut self, tier_id: impl Into<String>) -> Self {
        self.tier_ids.insert(tier_id.into());
        self
    }

    /// 建構器模式：添加生產任務
    pub fn with_stock_task(mut self, task_id: impl Into<String>) -> Self {
        self.stock_task_ids.insert(task_id.into());
        self
    }

    /// 是否已涵蓋某需求單元
    pub fn covers(&self, unit_id: &str) -> bool {
        self.tier_ids.contains(unit_id) || self.stock_task_ids.contains(unit_id)
    }
}

impl BatchView for CommittedBatch {
    fn batch_id(&self) -> String {
        self.id.to_string()
    }

    fn stage_code(&self) -> &str {
        &self.stage_code
    }

    fn unit_ids(&self) -> BTreeSet<&str> {
        self.tier_ids
            .iter()
            .chain(self.stock_task_ids.iter())
            .map(String::as_str)
            .collect()
    }

    fn scheduled_date(&self) -> Option<NaiveDate> {
        Some(self.scheduled_date)
    }

    fn status(&self) -> BatchStatus {
        self.status
    }

    fn earliest_due(&self) -> Option<NaiveDateTime> {
        self.due_at
    }
}

/// 對外呈現的批次：建議批次或已提交批次
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlannedBatch {
    Suggested(AggregatedBatch),
    Committed(CommittedBatch),
}

impl PlannedBatch {
    pub fn is_committed(&self) -> bool {
        matches!(self, PlannedBatch::Committed(_))
    }

    pub fn as_suggested(&self) -> Option<&AggregatedBatch> {
        match self {
            PlannedBatch::Suggested(batch) => Some(batch),
            PlannedBatch::Committed(_) => None,
        }
    }
}

impl BatchView for PlannedBatch {
    fn batch_id(&self) -> String {
        match self {
            PlannedBatch::Suggested(b) => b.batch_id(),
            PlannedBatch::Committed(b) => b.batch_id(),
        }
    }

    fn stage_code(&self) -> &str {
        match self {
            PlannedBatch::Suggested(b) => b.stage_code(),
            PlannedBatch::Committed(b) => b.stage_code(),
        }
    }

    fn unit_ids(&self) -> BTreeSet<&str> {
        match self {
            PlannedBatch::Suggested(b) => b.unit_ids(),
            PlannedBatch::Committed(b) => b.unit_ids(),
        }
    }

    fn scheduled_date(&self) -> Option<NaiveDate> {
        match self {
            PlannedBatch::Suggested(b) => b.scheduled_date(),
            PlannedBatch::Committed(b) => b.scheduled_date(),
        }
    }

    fn status(&self) -> BatchStatus {
        match self {
            PlannedBatch::Suggested(b) => b.status(),
            PlannedBatch::Committed(b) => b.status(),
        }
    }

    fn earliest_due(&self) -> Option<NaiveDateTime> {
        match self {
            PlannedBatch::Suggested(b) => b.earliest_due(),
            PlannedBatch::Committed(b) => b.earliest_due(),
        }
    }
}

/// 批次狀態統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusSummary {
    pub unscheduled: usize,
    pub scheduled: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub total: usize,
}

impl BatchStatusSummary {
    /// 統計批次狀態
    pub fn from_batches<B: BatchView>(batches: &[B]) -> Self {
        let mut summary = Self::default();
        for batch in batches {
            summary.record(batch.status());
        }
        summary
    }

    /// 記錄一筆狀態
    pub fn record(&mut self, status: BatchStatus) {
        match status {
            BatchStatus::Unscheduled => self.unscheduled += 1,
            BatchStatus::Scheduled => self.scheduled += 1,
            BatchStatus::InProgress => self.in_progress += 1,
            BatchStatus::Completed => self.completed += 1,
        }
        self.total += 1;
    }
}
