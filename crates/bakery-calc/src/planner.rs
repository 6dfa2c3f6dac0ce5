//! 生產排程主入口
//!
//! 每次請求只讀取一次外部資料（快照），之後的聚合、排程與依賴鏈都在同一份快照上計算。

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use bakery_core::{
    BakeryError, BatchStatusSummary, BatchTypeConfig, BatchTypeRecord, BatchTypeRegistry,
    BatchView, CommittedBatch, DemandUnit, GeometryEstimator, OrderDemand, PlannedBatch,
    PlannerConfig, ScheduleSuggestion, StandardGeometry, StockDemand,
};

use crate::aggregation::BatchAggregator;
use crate::chain::DependencyResolver;
use crate::graph::StageGraph;
use crate::reconcile::{reconcile, resolve_committed_due};
use crate::scheduler::AutoScheduler;
use crate::PlanWarning;

/// 外部資料來源（訂單、庫存任務、工序配置、已提交批次）
pub trait ProductionSource {
    /// 確認中 / 進行中的訂單與其蛋糕層
    fn fetch_orders(&self) -> bakery_core::Result<Vec<OrderDemand>>;

    /// 尚未指派批次的庫存品生產任務
    fn fetch_stock_tasks(&self) -> bakery_core::Result<Vec<StockDemand>>;

    /// 工序配置原始資料列
    fn fetch_batch_types(&self) -> bakery_core::Result<Vec<BatchTypeRecord>>;

    /// 已提交的批次
    fn fetch_committed_batches(&self) -> bakery_core::Result<Vec<CommittedBatch>>;
}

/// 記憶體內的資料來源
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pub orders: Vec<OrderDemand>,
    pub stock_tasks: Vec<StockDemand>,
    pub batch_types: Vec<BatchTypeRecord>,
    pub committed: Vec<CommittedBatch>,
}

impl ProductionSource for InMemorySource {
    fn fetch_orders(&self) -> bakery_core::Result<Vec<OrderDemand>> {
        Ok(self.orders.clone())
    }

    fn fetch_stock_tasks(&self) -> bakery_core::Result<Vec<StockDemand>> {
        Ok(self.stock_tasks.clone())
    }

    fn fetch_batch_types(&self) -> bakery_core::Result<Vec<BatchTypeRecord>> {
        Ok(self.batch_types.clone())
    }

    fn fetch_committed_batches(&self) -> bakery_core::Result<Vec<CommittedBatch>> {
        Ok(self.committed.clone())
    }
}

/// 一次請求使用的資料快照
#[derive(Debug, Clone)]
pub struct ProductionSnapshot {
    pub orders: Vec<OrderDemand>,
    pub stock_tasks: Vec<StockDemand>,
    pub registry: BatchTypeRegistry,
    pub committed: Vec<CommittedBatch>,
}

impl ProductionSnapshot {
    /// 從資料來源讀取快照；任何一項讀取失敗即整體失敗
    pub fn load(source: &dyn ProductionSource) -> bakery_core::Result<Self> {
        let orders = source.fetch_orders().map_err(|e| Self::fetch_error("orders", e))?;
        let stock_tasks = source
            .fetch_stock_tasks()
            .map_err(|e| Self::fetch_error("stock tasks", e))?;
        let records = source
            .fetch_batch_types()
            .map_err(|e| Self::fetch_error("batch types", e))?;
        let committed = source
            .fetch_committed_batches()
            .map_err(|e| Self::fetch_error("committed batches", e))?;

        let registry = BatchTypeRegistry::from_records(records).active_only();

        tracing::debug!(
            "快照載入完成：訂單 {} 筆，庫存任務 {} 筆，工序 {} 個，已提交批次 {} 個",
            orders.len(),
            stock_tasks.len(),
            registry.len(),
            committed.len()
        );

        Ok(Self {
            orders,
            stock_tasks,
            registry,
            committed,
        })
    }

    fn fetch_error(what: &str, error: BakeryError) -> BakeryError {
        tracing::error!("讀取 {} 失敗: {}", what, error);
        match error {
            BakeryError::FetchFailed { .. } => error,
            other => BakeryError::fetch_failed(what, other),
        }
    }
}

/// 批次查詢條件
#[derive(Debug, Clone, Default)]
pub struct BatchQuery {
    pub stage_code: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl BatchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：限定工序
    pub fn with_stage(mut self, stage_code: impl Into<String>) -> Self {
        self.stage_code = Some(stage_code.into());
        self
    }

    /// 建構器模式：限定日期區間（含端點）
    pub fn with_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// 批次是否符合條件；日期以排定日期為準，未排定時用最早交期
    pub fn matches<B: BatchView>(&self, batch: &B) -> bool {
        if let Some(stage) = &self.stage_code {
            if batch.stage_code() != stage.as_str() {
                return false;
            }
        }
        if self.from.is_none() && self.to.is_none() {
            return true;
        }

        let date = batch
            .scheduled_date()
            .or_else(|| batch.earliest_due().map(|due| due.date()));
        match date {
            Some(date) => {
                self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
            }
            None => false,
        }
    }
}

/// 批次清單與狀態統計
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchListing {
    pub batches: Vec<PlannedBatch>,
    pub summary: BatchStatusSummary,
}

/// 自動排程結果（僅供參考，不會寫回）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScheduleResult {
    pub suggestions: Vec<ScheduleSuggestion>,
    pub batch_types: Vec<BatchTypeConfig>,
    pub warnings: Vec<PlanWarning>,
}

/// 生產排程器
pub struct ProductionPlanner {
    config: PlannerConfig,
    geometry: Box<dyn GeometryEstimator>,
}

impl ProductionPlanner {
    /// 創建排程器，使用標準幾何估算
    pub fn new(config: PlannerConfig) -> Self {
        let geometry = StandardGeometry::new(config.frosting_grams_per_sq_inch);
        Self {
            config,
            geometry: Box::new(geometry),
        }
    }

    /// 建構器模式：替換幾何估算器
    pub fn with_geometry(mut self, geometry: Box<dyn GeometryEstimator>) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// 計算快照中的所有批次（已提交 + 建議）
    pub fn compute_batches(&self, snapshot: &ProductionSnapshot) -> Vec<PlannedBatch> {
        let orders = self.estimate_orders(&snapshot.orders);
        let aggregator = BatchAggregator::new(&snapshot.registry, &self.config);
        let suggested = aggregator.aggregate_orders(&orders, &snapshot.stock_tasks);

        let units: Vec<DemandUnit> = snapshot
            .orders
            .iter()
            .flat_map(|order| order.tiers.iter().cloned().map(DemandUnit::Tier))
            .chain(snapshot.stock_tasks.iter().cloned().map(DemandUnit::Stock))
            .collect();
        let committed = resolve_committed_due(snapshot.committed.clone(), &units);

        reconcile(suggested, committed)
    }

    /// 尚未有量測值的蛋糕層以幾何估算器補上
    fn estimate_orders(&self, orders: &[OrderDemand]) -> Vec<OrderDemand> {
        orders
            .iter()
            .cloned()
            .map(|mut order| {
                order.tiers = order
                    .tiers
                    .into_iter()
                    .map(|tier| {
                        if tier.surface_area.is_zero() && tier.frosting_mass.is_zero() {
                            tier.estimate_with(self.geometry.as_ref(), self.config.default_tier_height)
                        } else {
                            tier
                        }
                    })
                    .collect();
                order
            })
            .collect()
    }

    /// 批次清單（可依工序與日期區間篩選）
    pub fn list_batches(
        &self,
        source: &dyn ProductionSource,
        query: &BatchQuery,
    ) -> bakery_core::Result<BatchListing> {
        let snapshot = ProductionSnapshot::load(source)?;
        Ok(self.list_batches_in(&snapshot, query))
    }

    pub fn list_batches_in(&self, snapshot: &ProductionSnapshot, query: &BatchQuery) -> BatchListing {
        let batches: Vec<PlannedBatch> = self
            .compute_batches(snapshot)
            .into_iter()
            .filter(|batch| query.matches(batch))
            .collect();
        let summary = BatchStatusSummary::from_batches(&batches);

        tracing::info!("批次清單：{} 個（未排定 {}）", summary.total, summary.unscheduled);

        BatchListing { batches, summary }
    }

    /// 自動排程建議
    pub fn auto_schedule(
        &self,
        source: &dyn ProductionSource,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> bakery_core::Result<AutoScheduleResult> {
        let snapshot = ProductionSnapshot::load(source)?;
        self.auto_schedule_in(&snapshot, from, to)
    }

    pub fn auto_schedule_in(
        &self,
        snapshot: &ProductionSnapshot,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> bakery_core::Result<AutoScheduleResult> {
        let start_time = std::time::Instant::now();

        let graph = StageGraph::build(&snapshot.registry);
        graph.validate()?;

        let mut warnings: Vec<PlanWarning> = snapshot
            .registry
            .unknown_prerequisites()
            .into_iter()
            .map(|(stage, dep)| {
                PlanWarning::warning(stage, format!("prerequisite {} is not an active stage", dep))
            })
            .collect();

        let batches = self.compute_batches(snapshot);
        warnings.extend(
            batches
                .iter()
                .filter(|batch| batch.earliest_due().is_none())
                .map(|batch| {
                    PlanWarning::info(batch.batch_id(), "no due date, left unscheduled".to_string())
                }),
        );

        let scheduler = AutoScheduler::new(&graph, &snapshot.registry, self.config.default_lead_time_days);
        let suggestions = scheduler.suggest_in_range(&batches, from, to);

        tracing::info!("自動排程完成，耗時 {:?}", start_time.elapsed());

        Ok(AutoScheduleResult {
            suggestions,
            batch_types: snapshot.registry.configs().to_vec(),
            warnings,
        })
    }

    /// 與指定批次相連的所有批次ID
    pub fn chain_for(
        &self,
        source: &dyn ProductionSource,
        batch_id: &str,
    ) -> bakery_core::Result<BTreeSet<String>> {
        let snapshot = ProductionSnapshot::load(source)?;
        self.chain_for_in(&snapshot, batch_id)
    }

    pub fn chain_for_in(
        &self,
        snapshot: &ProductionSnapshot,
        batch_id: &str,
    ) -> bakery_core::Result<BTreeSet<String>> {
        let batches = self.compute_batches(snapshot);
        if !batches.iter().any(|b| b.batch_id() == batch_id) {
            return Err(BakeryError::BatchNotFound(batch_id.to_string()));
        }

        let graph = StageGraph::build(&snapshot.registry);
        let edges = DependencyResolver::build_edges(&batches, &graph);
        Ok(DependencyResolver::chain_of(batch_id, &edges))
    }
}

impl Default for ProductionPlanner {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WarningSeverity;
    use bakery_core::{BatchStatus, OrderStatus, StockRecipeLink, TierDemand};
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;

    fn record(code: &str, lead: i64, depends_on: &str, sort: i32) -> BatchTypeRecord {
        BatchTypeRecord {
            code: code.to_string(),
            name: code.to_string(),
            lead_time_days: lead,
            depends_on: Some(depends_on.to_string()),
            groupable: true,
            sort_order: sort,
            active: true,
            color: None,
        }
    }

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, month, day)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    fn source() -> InMemorySource {
        InMemorySource {
            orders: vec![
                OrderDemand::new("O-1", OrderStatus::Confirmed)
                    .with_customer("Ada")
                    .with_tier(
                        TierDemand::new("T-1", "", at(7, 1), "8\"", 24)
                            .with_batter("Vanilla")
                            .with_filling("Lemon Curd"),
                    ),
                OrderDemand::new("O-2", OrderStatus::InProgress).with_tier(
                    TierDemand::new("T-2", "", at(7, 3), "6\"", 12).with_batter("Vanilla"),
                ),
            ],
            stock_tasks: vec![StockDemand::new("S-1", "ITEM-1", "Curd jar", Decimal::from(5))
                .with_scheduled_date(NaiveDate::from_ymd_opt(2025, 7, 2).unwrap())
                .with_recipe(StockRecipeLink::new("Lemon Curd", "filling", Decimal::from(200)))],
            batch_types: vec![
                record("BAKE", 2, "[]", 1),
                record("PREP", 3, "", 2),
                record("STACK", 1, r#"["BAKE","PREP"]"#, 3),
            ],
            committed: Vec::new(),
        }
    }

    struct FailingSource;

    impl ProductionSource for FailingSource {
        fn fetch_orders(&self) -> bakery_core::Result<Vec<OrderDemand>> {
            Ok(Vec::new())
        }

        fn fetch_stock_tasks(&self) -> bakery_core::Result<Vec<StockDemand>> {
            Err(BakeryError::fetch_failed("stock tasks", "connection reset"))
        }

        fn fetch_batch_types(&self) -> bakery_core::Result<Vec<BatchTypeRecord>> {
            Ok(Vec::new())
        }

        fn fetch_committed_batches(&self) -> bakery_core::Result<Vec<CommittedBatch>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_list_batches_with_summary() {
        let planner = ProductionPlanner::default();
        let listing = planner.list_batches(&source(), &BatchQuery::new()).unwrap();

        let ids: Vec<_> = listing.batches.iter().map(|b| b.batch_id()).collect();
        assert_eq!(ids, vec!["BAKE-Vanilla", "PREP-Lemon Curd"]);
        assert_eq!(listing.summary.unscheduled, 2);
        assert_eq!(listing.summary.total, 2);

        let prep = listing.batches[1].as_suggested().unwrap();
        assert_eq!(prep.total_tiers, 1);
        assert_eq!(prep.total_stock_quantity, Decimal::from(1000));
    }

    #[test]
    fn test_geometry_estimated_for_bare_tiers() {
        let planner = ProductionPlanner::default();
        let listing = planner.list_batches(&source(), &BatchQuery::new().with_stage("BAKE")).unwrap();

        let bake = listing.batches[0].as_suggested().unwrap();
        assert!(bake.total_surface_area > Decimal::ZERO);
        assert!(bake.total_frosting_mass > Decimal::ZERO);
    }

    #[test]
    fn test_query_filters_by_stage_and_range() {
        let planner = ProductionPlanner::default();
        let query = BatchQuery::new()
            .with_stage("PREP")
            .with_range(NaiveDate::from_ymd_opt(2025, 7, 2), None);

        let listing = planner.list_batches(&source(), &query).unwrap();

        assert!(listing.batches.is_empty());
        assert_eq!(listing.summary, BatchStatusSummary::default());
    }

    #[test]
    fn test_committed_batches_listed_and_counted() {
        let mut source = source();
        source.committed.push(
            CommittedBatch::new("BAKE", "Vanilla", NaiveDate::from_ymd_opt(2025, 6, 29).unwrap())
                .with_status(BatchStatus::InProgress)
                .with_tier("T-1"),
        );

        let listing = ProductionPlanner::default()
            .list_batches(&source, &BatchQuery::new())
            .unwrap();

        assert_eq!(listing.summary.in_progress, 1);
        assert_eq!(listing.summary.unscheduled, 2);
        let bake = listing
            .batches
            .iter()
            .filter_map(|b| b.as_suggested())
            .find(|b| b.stage_code == "BAKE")
            .unwrap();
        assert_eq!(bake.total_tiers, 1);
        assert_eq!(bake.tiers[0].tier_id, "T-2");
    }

    #[test]
    fn test_auto_schedule() {
        let result = ProductionPlanner::default()
            .auto_schedule(&source(), None, None)
            .unwrap();

        assert_eq!(result.batch_types.len(), 3);
        assert!(result.warnings.is_empty());

        let bake = result.suggestions.iter().find(|s| s.batch_id == "BAKE-Vanilla").unwrap();
        assert_eq!(bake.suggested_date, NaiveDate::from_ymd_opt(2025, 6, 29).unwrap());

        let prep = result.suggestions.iter().find(|s| s.batch_id == "PREP-Lemon Curd").unwrap();
        assert_eq!(prep.suggested_date, NaiveDate::from_ymd_opt(2025, 6, 28).unwrap());
    }

    #[test]
    fn test_auto_schedule_serializes_camel_case() {
        let result = ProductionPlanner::default()
            .auto_schedule(&source(), None, None)
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        let first = &json["suggestions"][0];
        assert_eq!(first["batchId"], "BAKE-Vanilla");
        assert_eq!(first["suggestedDate"], "2025-06-29");
        assert!(first.get("missingDependencies").is_none());
        assert_eq!(json["batchTypes"][2]["dependsOn"][0], "BAKE");
    }

    #[test]
    fn test_committed_batch_is_suggested_with_current_date() {
        let mut source = source();
        let bake = CommittedBatch::new("BAKE", "Vanilla", NaiveDate::from_ymd_opt(2025, 6, 27).unwrap())
            .with_tier("T-1");
        let bake_id = bake.id.to_string();
        source.committed.push(bake);

        let result = ProductionPlanner::default()
            .auto_schedule(&source, None, None)
            .unwrap();

        let suggestion = result.suggestions.iter().find(|s| s.batch_id == bake_id).unwrap();
        assert_eq!(suggestion.current_date, NaiveDate::from_ymd_opt(2025, 6, 27));
        assert_eq!(suggestion.suggested_date, NaiveDate::from_ymd_opt(2025, 6, 29).unwrap());
        assert!(suggestion.is_change());
    }

    #[test]
    fn test_batch_without_due_date_reported_as_info() {
        let mut source = source();
        source.stock_tasks.push(
            StockDemand::new("S-2", "ITEM-2", "Ganache tub", Decimal::ONE)
                .with_recipe(StockRecipeLink::new("Ganache", "frosting", Decimal::from(300))),
        );

        let result = ProductionPlanner::default()
            .auto_schedule(&source, None, None)
            .unwrap();

        assert!(result.suggestions.iter().all(|s| s.batch_id != "PREP-Ganache"));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].subject, "PREP-Ganache");
        assert_eq!(result.warnings[0].severity, WarningSeverity::Info);
    }

    #[test]
    fn test_auto_schedule_rejects_cycles() {
        let mut source = source();
        source.batch_types = vec![record("BAKE", 2, r#"["PREP"]"#, 1), record("PREP", 1, r#"["BAKE"]"#, 2)];

        let result = ProductionPlanner::default().auto_schedule(&source, None, None);

        assert!(matches!(result, Err(BakeryError::CyclicDependency(_))));
    }

    #[test]
    fn test_unknown_prerequisite_reported_as_warning() {
        let mut source = source();
        source.batch_types.push(record("DECORATE", 0, r#"["AIRBRUSH"]"#, 4));

        let result = ProductionPlanner::default()
            .auto_schedule(&source, None, None)
            .unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].subject, "DECORATE");
    }

    #[test]
    fn test_fetch_failure_is_surfaced() {
        let result = ProductionPlanner::default().list_batches(&FailingSource, &BatchQuery::new());

        match result {
            Err(BakeryError::FetchFailed { source_name, message }) => {
                assert_eq!(source_name, "stock tasks");
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected result: {:?}", other.map(|l| l.summary)),
        }
    }

    #[test]
    fn test_empty_source() {
        let listing = ProductionPlanner::default()
            .list_batches(&InMemorySource::default(), &BatchQuery::new())
            .unwrap();

        assert!(listing.batches.is_empty());
        assert_eq!(listing.summary.total, 0);
    }

    #[test]
    fn test_chain_for() {
        let mut source = source();
        source.committed.push(
            CommittedBatch::new("STACK", "Vanilla", NaiveDate::from_ymd_opt(2025, 6, 30).unwrap())
                .with_tier("T-1"),
        );
        let planner = ProductionPlanner::default();
        let stack_id = source.committed[0].id.to_string();

        let chain = planner.chain_for(&source, "BAKE-Vanilla").unwrap();

        let expected: BTreeSet<String> =
            [stack_id, "BAKE-Vanilla".to_string(), "PREP-Lemon Curd".to_string()].into_iter().collect();
        assert_eq!(chain, expected);
    }

    #[test]
    fn test_chain_for_unknown_batch() {
        let result = ProductionPlanner::default().chain_for(&source(), "BAKE-Nope");
        assert!(matches!(result, Err(BakeryError::BatchNotFound(_))));
    }
}
