//! 批次聚合
//!
//! 依（工序代碼, 配方名稱）把蛋糕層與庫存品生產任務合併成建議批次。

use std::collections::{BTreeMap, BTreeSet};

use bakery_core::{
    AggregatedBatch, BatchTypeRegistry, DemandUnit, OrderDemand, PlannerConfig, RecipeRole,
    StockContribution, StockDemand, TierDemand,
};

/// 訂單ID → 急單可跳過的工序
pub type RushSkipMap = BTreeMap<String, BTreeSet<String>>;

/// 由訂單建立急單跳過表（非急單不列入）
pub fn rush_skip_map(orders: &[OrderDemand]) -> RushSkipMap {
    orders
        .iter()
        .filter(|order| order.is_rush)
        .map(|order| (order.order_id.clone(), order.skip_stages()))
        .filter(|(_, stages)| !stages.is_empty())
        .collect()
}

/// 需求單元在某工序上的落點
struct Placement {
    stage_code: String,
    recipe_name: String,
    role: RecipeRole,
    payload: Payload,
}

enum Payload {
    Tier(TierDemand),
    Stock(StockContribution),
}

/// 批次聚合器
pub struct BatchAggregator<'a> {
    registry: &'a BatchTypeRegistry,
    config: &'a PlannerConfig,
}

impl<'a> BatchAggregator<'a> {
    pub fn new(registry: &'a BatchTypeRegistry, config: &'a PlannerConfig) -> Self {
        Self { registry, config }
    }

    /// 由訂單與庫存任務聚合批次
    pub fn aggregate_orders(
        &self,
        orders: &[OrderDemand],
        stock_tasks: &[StockDemand],
    ) -> Vec<AggregatedBatch> {
        let units: Vec<DemandUnit> = orders
            .iter()
            .filter(|order| {
                let keep = self.config.is_schedulable(order.status);
                if !keep {
                    tracing::debug!("訂單 {} 狀態 {:?} 不納入排程", order.order_id, order.status);
                }
                keep
            })
            .flat_map(|order| order.tiers.iter().cloned().map(DemandUnit::Tier))
            .chain(stock_tasks.iter().cloned().map(DemandUnit::Stock))
            .collect();

        self.aggregate(&units, &rush_skip_map(orders))
    }

    /// 聚合需求單元
    ///
    /// 純函數：相同輸入得到相同的批次與順序。
    pub fn aggregate(&self, units: &[DemandUnit], rush_skip: &RushSkipMap) -> Vec<AggregatedBatch> {
        tracing::info!("開始批次聚合：需求單元 {} 筆", units.len());

        let batches = units
            .iter()
            .flat_map(|unit| self.placements(unit, rush_skip))
            .fold(BTreeMap::<String, AggregatedBatch>::new(), |mut acc, placement| {
                let key = self.batch_key(&placement);
                let batch = acc.entry(key.clone()).or_insert_with(|| {
                    AggregatedBatch::new(
                        key,
                        placement.stage_code.clone(),
                        placement.recipe_name.clone(),
                        placement.role,
                    )
                });
                match placement.payload {
                    Payload::Tier(tier) => batch.add_tier(tier),
                    Payload::Stock(contribution) => batch.add_stock(contribution),
                }
                acc
            });

        let mut result: Vec<AggregatedBatch> = batches
            .into_values()
            .filter(|batch| !batch.is_empty())
            .collect();

        self.sort_batches(&mut result);

        tracing::info!("批次聚合完成：批次 {} 個", result.len());
        result
    }

    /// 標準順序：工序順序 → 最早交期（無交期排最後）→ 批次ID
    pub fn sort_batches(&self, batches: &mut [AggregatedBatch]) {
        batches.sort_by(|a, b| {
            self.registry
                .stage_rank(&a.stage_code)
                .cmp(&self.registry.stage_rank(&b.stage_code))
                .then_with(|| match (a.earliest_due_date, b.earliest_due_date) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    /// 批次鍵；不可合併的工序每個需求單元獨立成批
    fn batch_key(&self, placement: &Placement) -> String {
        let key = AggregatedBatch::key(&placement.stage_code, &placement.recipe_name);
        if self.registry.is_groupable(&placement.stage_code) {
            key
        } else {
            let unit_id = match &placement.payload {
                Payload::Tier(tier) => tier.tier_id.as_str(),
                Payload::Stock(contribution) => contribution.task_id.as_str(),
            };
            format!("{}-{}", key, unit_id)
        }
    }

    fn placements(&self, unit: &DemandUnit, rush_skip: &RushSkipMap) -> Vec<Placement> {
        match unit {
            DemandUnit::Tier(tier) => self.tier_placements(tier, rush_skip),
            DemandUnit::Stock(stock) => self.stock_placements(stock),
        }
    }

    /// 蛋糕層最多落在兩個工序：麵糊進烘焙，內餡（沒有內餡時用自製糖霜）進備料
    fn tier_placements(&self, tier: &TierDemand, rush_skip: &RushSkipMap) -> Vec<Placement> {
        let skipped = rush_skip.get(&tier.order_id);

        let batter = non_blank(tier.batter.as_deref()).map(|name| (RecipeRole::Batter, name));
        let filling = non_blank(tier.filling.as_deref()).map(|name| (RecipeRole::Filling, name));
        let frosting = non_blank(tier.frosting.as_deref())
            .filter(|name| {
                let purchased = self.config.is_purchased_frosting(name);
                if purchased {
                    tracing::debug!("蛋糕層 {} 的糖霜 {} 為外購品，不列入備料", tier.tier_id, name);
                }
                !purchased
            })
            .map(|name| (RecipeRole::Frosting, name));

        [batter, filling.or(frosting)]
            .into_iter()
            .flatten()
            .filter_map(|(role, recipe_name)| {
                let stage_code = self.config.stage_for_role(role);

                if tier.is_assigned_to(stage_code) {
                    tracing::debug!("蛋糕層 {} 已有 {} 批次，略過", tier.tier_id, stage_code);
                    return None;
                }
                if skipped.is_some_and(|stages| stages.contains(stage_code)) {
                    tracing::debug!("急單 {} 跳過工序 {}", tier.order_id, stage_code);
                    return None;
                }
                if !self.registry.is_active(stage_code) {
                    tracing::debug!("工序 {} 未啟用，蛋糕層 {} 不列入", stage_code, tier.tier_id);
                    return None;
                }

                Some(Placement {
                    stage_code: stage_code.to_string(),
                    recipe_name: recipe_name.to_string(),
                    role,
                    payload: Payload::Tier(tier.clone()),
                })
            })
            .collect()
    }

    fn stock_placements(&self, stock: &StockDemand) -> Vec<Placement> {
        let due_at = stock.due_at();

        stock
            .recipes
            .iter()
            .filter_map(|link| {
                let recipe_name = link.recipe_name.trim();
                if recipe_name.is_empty() {
                    tracing::debug!("生產任務 {} 有未命名的配方，略過", stock.task_id);
                    return None;
                }

                let role = link.role();
                let stage_code = self.config.stage_for_role(role);
                if !self.registry.is_active(stage_code) {
                    tracing::debug!("工序 {} 未啟用，生產任務 {} 不列入", stage_code, stock.task_id);
                    return None;
                }

                Some(Placement {
                    stage_code: stage_code.to_string(),
                    recipe_name: recipe_name.to_string(),
                    role,
                    payload: Payload::Stock(StockContribution {
                        task_id: stock.task_id.clone(),
                        item_id: stock.item_id.clone(),
                        item_name: stock.item_name.clone(),
                        target_quantity: stock.target_quantity,
                        quantity_per_unit: link.quantity_per_unit,
                        recipe_mass: stock.recipe_mass(link),
                        due_at,
                    }),
                })
            })
            .collect()
    }
}

fn non_blank(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|name| !name.is_empty())
}
