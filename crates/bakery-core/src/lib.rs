//! # Bakery Core
//!
//! 生產批次排程的核心資料模型與類型定義

pub mod batch;
pub mod batch_type;
pub mod config;
pub mod demand;
pub mod geometry;
pub mod schedule;

// Re-export 主要類型
pub use batch::{
    AggregatedBatch, BatchStatus, BatchStatusSummary, BatchView, CommittedBatch, PlannedBatch,
    StockContribution,
};
pub use batch_type::{parse_stage_list, BatchTypeConfig, BatchTypeRecord, BatchTypeRegistry};
pub use config::PlannerConfig;
pub use demand::{
    DemandUnit, OrderDemand, OrderStatus, RecipeRole, StockDemand, StockRecipeLink, TierDemand,
};
pub use geometry::{GeometryEstimator, StandardGeometry};
pub use schedule::{DependencyEdge, MissingDependency, ScheduleSuggestion};

/// 常用工序代碼
pub mod stage {
    /// 烘烤
    pub const BAKE: &str = "BAKE";
    /// 餡料 / 糖霜備料
    pub const PREP: &str = "PREP";
    /// 疊層
    pub const STACK: &str = "STACK";
    /// 裝飾
    pub const DECORATE: &str = "DECORATE";
}

/// 排程引擎錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum BakeryError {
    #[error("讀取 {source_name} 失敗: {message}")]
    FetchFailed {
        source_name: String,
        message: String,
    },

    #[error("工序依賴存在循環: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),

    #[error("無效的排程配置: {0}")]
    InvalidConfig(String),

    #[error("找不到批次: {0}")]
    BatchNotFound(String),
}

impl BakeryError {
    /// 建立資料讀取錯誤
    pub fn fetch_failed(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::FetchFailed {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BakeryError>;
