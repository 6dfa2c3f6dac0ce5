//! # Bakery Production Planning
//!
//! 烘焙生產批次聚合與依賴排程

pub use bakery_calc as calc;
pub use bakery_core as model;

pub use bakery_calc::{
    AutoScheduleResult, BatchListing, BatchQuery, InMemorySource, PlanWarning, ProductionPlanner,
    ProductionSnapshot, ProductionSource,
};
pub use bakery_core::{BakeryError, PlannerConfig, Result};
