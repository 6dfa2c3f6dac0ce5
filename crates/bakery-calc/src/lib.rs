//! # Bakery Calculation Engine
//!
//! 批次聚合、工序依賴圖、自動排程建議與依賴鏈解析

pub mod aggregation;
pub mod chain;
pub mod graph;
pub mod lead_time;
pub mod planner;
pub mod reconcile;
pub mod scheduler;

// Re-export 主要類型
pub use aggregation::{rush_skip_map, BatchAggregator, RushSkipMap};
pub use chain::DependencyResolver;
pub use graph::StageGraph;
pub use lead_time::LeadTimeCalculator;
pub use planner::{
    AutoScheduleResult, BatchListing, BatchQuery, InMemorySource, ProductionPlanner,
    ProductionSnapshot, ProductionSource,
};
pub use reconcile::reconcile;
pub use scheduler::AutoScheduler;

use serde::Serialize;

/// 排程警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWarning {
    pub subject: String,
    pub message: String,
    pub severity: WarningSeverity,
}

impl PlanWarning {
    pub fn new(subject: String, message: String, severity: WarningSeverity) -> Self {
        Self {
            subject,
            message,
            severity,
        }
    }

    pub fn info(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Info)
    }

    pub fn warning(subject: String, message: String) -> Self {
        Self::new(subject, message, WarningSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Info,
    Warning,
}
