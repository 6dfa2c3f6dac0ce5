//! 建議批次與已提交批次的合併

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use bakery_core::{AggregatedBatch, CommittedBatch, DemandUnit, PlannedBatch};

/// 補上已提交批次的交期
///
/// 未記錄交期的已提交批次，取其涵蓋的蛋糕層與生產任務中最早的交期。
pub fn resolve_committed_due(committed: Vec<CommittedBatch>, units: &[DemandUnit]) -> Vec<CommittedBatch> {
    let due_by_unit: BTreeMap<&str, NaiveDateTime> = units
        .iter()
        .filter_map(|unit| unit.due_at().map(|due| (unit.unit_id(), due)))
        .collect();

    committed
        .into_iter()
        .map(|mut batch| {
            if batch.due_at.is_none() {
                batch.due_at = batch
                    .tier_ids
                    .iter()
                    .chain(batch.stock_task_ids.iter())
                    .filter_map(|id| due_by_unit.get(id.as_str()).copied())
                    .min();
                if batch.due_at.is_none() {
                    tracing::debug!("已提交批次 {} 的需求單元都沒有交期", batch.id);
                }
            }
            batch
        })
        .collect()
}

/// 合併建議批次與已提交批次
///
/// 已提交批次一律保留；建議批次移除已被同工序已提交批次涵蓋的需求單元，
/// 移除後為空的建議批次不輸出。
pub fn reconcile(suggested: Vec<AggregatedBatch>, committed: Vec<CommittedBatch>) -> Vec<PlannedBatch> {
    let mut covered: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for batch in &committed {
        covered
            .entry(batch.stage_code.as_str())
            .or_default()
            .extend(batch.tier_ids.iter().chain(batch.stock_task_ids.iter()).map(String::as_str));
    }

    let mut remaining = Vec::with_capacity(suggested.len());
    for mut batch in suggested {
        if let Some(units) = covered.get(batch.stage_code.as_str()) {
            let before = batch.tiers.len() + batch.stock_items.len();
            batch.retain_units(|id| !units.contains(id));
            let after = batch.tiers.len() + batch.stock_items.len();
            if after < before {
                tracing::debug!("建議批次 {} 有 {} 個需求已提交", batch.id, before - after);
            }
        }
        if batch.is_empty() {
            tracing::debug!("建議批次 {} 已完全被提交批次涵蓋", batch.id);
            continue;
        }
        remaining.push(batch);
    }

    let mut committed = committed;
    committed.sort_by(|a, b| {
        a.scheduled_date
            .cmp(&b.scheduled_date)
            .then_with(|| a.stage_code.cmp(&b.stage_code))
            .then_with(|| a.recipe_name.cmp(&b.recipe_name))
            .then_with(|| a.id.cmp(&b.id))
    });

    committed
        .into_iter()
        .map(PlannedBatch::Committed)
        .chain(remaining.into_iter().map(PlannedBatch::Suggested))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_core::{BatchView, RecipeRole, StockDemand, TierDemand};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn suggested(stage: &str, recipe: &str, tier_ids: &[&str]) -> AggregatedBatch {
        let due = NaiveDate::from_ymd_opt(2025, 7, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let mut batch = AggregatedBatch::new(
            AggregatedBatch::key(stage, recipe),
            stage,
            recipe,
            RecipeRole::Batter,
        );
        for id in tier_ids {
            batch.add_tier(TierDemand::new(*id, "O-1", due, "8\"", 10));
        }
        batch
    }

    fn committed(stage: &str, tier_ids: &[&str]) -> CommittedBatch {
        tier_ids.iter().fold(
            CommittedBatch::new(stage, "Vanilla", NaiveDate::from_ymd_opt(2025, 6, 29).unwrap()),
            |batch, id| batch.with_tier(*id),
        )
    }

    #[test]
    fn test_committed_batches_come_first() {
        let result = reconcile(
            vec![suggested("BAKE", "Lemon", &["T-5"])],
            vec![committed("BAKE", &["T-1"])],
        );

        assert_eq!(result.len(), 2);
        assert!(result[0].is_committed());
        assert!(!result[1].is_committed());
    }

    #[test]
    fn test_covered_units_removed_from_suggestion() {
        let result = reconcile(
            vec![suggested("BAKE", "Vanilla", &["T-1", "T-2"])],
            vec![committed("BAKE", &["T-1"])],
        );

        let batch = result[1].as_suggested().unwrap();
        assert_eq!(batch.total_tiers, 1);
        assert_eq!(batch.tiers[0].tier_id, "T-2");
    }

    #[test]
    fn test_fully_covered_suggestion_dropped() {
        let result = reconcile(
            vec![suggested("BAKE", "Vanilla", &["T-1"])],
            vec![committed("BAKE", &["T-1"])],
        );

        assert_eq!(result.len(), 1);
        assert!(result[0].is_committed());
    }

    #[test]
    fn test_other_stage_commitment_does_not_cover() {
        let result = reconcile(
            vec![suggested("PREP", "Curd", &["T-1"])],
            vec![committed("BAKE", &["T-1"])],
        );

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].unit_ids().len(), 1);
    }

    #[test]
    fn test_committed_due_taken_from_earliest_covered_unit() {
        let at = |day| {
            NaiveDate::from_ymd_opt(2025, 7, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        };
        let units: Vec<DemandUnit> = vec![
            TierDemand::new("T-1", "O-1", at(3), "8\"", 10).into(),
            TierDemand::new("T-2", "O-1", at(2), "6\"", 8).into(),
            TierDemand::new("T-9", "O-2", at(1), "6\"", 8).into(),
            StockDemand::new("S-1", "ITEM-1", "Jam jar", Decimal::ONE).into(),
        ];
        let explicit = committed("BAKE", &["T-9"]).with_due_at(at(5));

        let resolved = resolve_committed_due(
            vec![committed("BAKE", &["T-1", "T-2"]), committed("PREP", &["S-1"]), explicit],
            &units,
        );

        assert_eq!(resolved[0].due_at, Some(at(2)));
        assert_eq!(resolved[0].earliest_due(), Some(at(2)));
        assert_eq!(resolved[1].due_at, None);
        assert_eq!(resolved[2].due_at, Some(at(5)));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reconcile(Vec::new(), Vec::new()).is_empty());
    }
}
