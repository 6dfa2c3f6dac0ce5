//! 自動排程建議
//!
//! 建議日期 = 批次最早交期 − 工序提前期（日曆天）。
//! 前置工序提前期較長時附上警告，但不檢查實際的前置批次是否存在。

use chrono::NaiveDate;

use bakery_core::{BatchTypeRegistry, BatchView, MissingDependency, ScheduleSuggestion};

use crate::graph::StageGraph;
use crate::lead_time::LeadTimeCalculator;

/// 自動排程器
pub struct AutoScheduler<'a> {
    graph: &'a StageGraph,
    registry: &'a BatchTypeRegistry,
    default_lead_time_days: u32,
}

impl<'a> AutoScheduler<'a> {
    pub fn new(
        graph: &'a StageGraph,
        registry: &'a BatchTypeRegistry,
        default_lead_time_days: u32,
    ) -> Self {
        Self {
            graph,
            registry,
            default_lead_time_days,
        }
    }

    /// 工序提前期；未知工序使用預設值
    pub fn lead_time(&self, stage_code: &str) -> u32 {
        self.registry
            .lead_time(stage_code, self.default_lead_time_days)
    }

    /// 為所有批次產生排程建議
    pub fn suggest<B: BatchView>(&self, batches: &[B]) -> Vec<ScheduleSuggestion> {
        tracing::info!("開始產生排程建議：批次 {} 個", batches.len());

        let suggestions: Vec<_> = batches
            .iter()
            .filter_map(|batch| self.suggest_one(batch))
            .collect();

        let warned = suggestions.iter().filter(|s| s.has_warnings()).count();
        tracing::info!(
            "排程建議完成：建議 {} 筆，前置工序警告 {} 筆",
            suggestions.len(),
            warned
        );

        suggestions
    }

    /// 只為最早交期落在區間內的批次產生建議（含端點）
    pub fn suggest_in_range<B: BatchView>(
        &self,
        batches: &[B],
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<ScheduleSuggestion> {
        let in_range: Vec<&B> = batches
            .iter()
            .filter(|batch| {
                batch.earliest_due().is_some_and(|due| {
                    let date = due.date();
                    from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
                })
            })
            .collect();

        tracing::debug!("日期區間內批次: {} / {}", in_range.len(), batches.len());

        in_range
            .into_iter()
            .filter_map(|batch| self.suggest_one(batch))
            .collect()
    }

    /// 單一批次的排程建議；沒有交期的批次無法推算
    pub fn suggest_one<B: BatchView>(&self, batch: &B) -> Option<ScheduleSuggestion> {
        let batch_id = batch.batch_id();
        let Some(due_at) = batch.earliest_due() else {
            tracing::debug!("批次 {} 沒有交期，無法產生建議", batch_id);
            return None;
        };

        let stage_code = batch.stage_code();
        let lead_time_days = self.lead_time(stage_code);
        let suggested_date = LeadTimeCalculator::start_date_for(due_at, lead_time_days);
        let dependencies = self.graph.prerequisites(stage_code).to_vec();

        let missing: Vec<MissingDependency> = dependencies
            .iter()
            .filter_map(|dep| {
                let dep_lead_time = self.lead_time(dep);
                (dep_lead_time > lead_time_days).then(|| MissingDependency {
                    stage_code: dep.clone(),
                    suggested_date: LeadTimeCalculator::start_date_for(due_at, dep_lead_time),
                    lead_time_days: dep_lead_time,
                })
            })
            .collect();

        let mut reason = format!(
            "Due {}, {} lead time {} day(s)",
            due_at.date(),
            stage_code,
            lead_time_days
        );
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|m| m.stage_code.as_str()).collect();
            reason.push_str(&format!("; prerequisite {} needs an earlier start", names.join(", ")));
            tracing::debug!("批次 {} 的前置工序提前期較長: {:?}", batch_id, names);
        }

        Some(ScheduleSuggestion {
            batch_id,
            stage_code: stage_code.to_string(),
            current_date: batch.scheduled_date(),
            suggested_date,
            lead_time_days,
            reason,
            dependencies,
            missing_dependencies: (!missing.is_empty()).then_some(missing),
        })
    }
}
