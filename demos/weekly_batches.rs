//! 一週生產批次示例

use anyhow::Context;
use bakery::model::{
    BatchStatus, BatchTypeRecord, BatchView, CommittedBatch, OrderDemand, OrderStatus,
    StockDemand, StockRecipeLink, TierDemand,
};
use bakery::{BatchQuery, InMemorySource, PlannerConfig, ProductionPlanner};
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn stage(code: &str, name: &str, lead: i64, depends_on: &str, sort_order: i32) -> BatchTypeRecord {
    BatchTypeRecord {
        code: code.to_string(),
        name: name.to_string(),
        lead_time_days: lead,
        depends_on: Some(depends_on.to_string()),
        groupable: true,
        sort_order,
        active: true,
        color: None,
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== 一週生產批次示例 ===\n");

    let day = |d: u32| NaiveDate::from_ymd_opt(2025, 7, d).context("無效的日期");
    let at = |d: u32| -> anyhow::Result<_> {
        day(d)?.and_hms_opt(15, 0, 0).context("無效的時間")
    };

    let source = InMemorySource {
        orders: vec![
            OrderDemand::new("O-1001", OrderStatus::Confirmed)
                .with_customer("Ada")
                .with_tier(
                    TierDemand::new("T-1", "", at(5)?, "10\"", 38)
                        .with_batter("Vanilla")
                        .with_filling("Raspberry")
                        .with_frosting("Swiss Buttercream")
                        .with_complexity(2),
                )
                .with_tier(
                    TierDemand::new("T-2", "", at(5)?, "6\"", 12)
                        .with_batter("Vanilla")
                        .with_frosting("Fondant Ivory"),
                ),
            OrderDemand::new("O-1002", OrderStatus::InProgress)
                .with_customer("Alan")
                .with_rush(r#"["BAKE"]"#)
                .with_tier(
                    TierDemand::new("T-3", "", at(3)?, "8\"", 24)
                        .with_batter("Chocolate")
                        .with_filling("Raspberry"),
                ),
        ],
        stock_tasks: vec![StockDemand::new("TASK-7", "SKU-CUP", "Vanilla cupcakes", Decimal::from(24))
            .with_scheduled_date(day(4)?)
            .with_recipe(StockRecipeLink::new("Vanilla", "batter", Decimal::from(45)))],
        batch_types: vec![
            stage("BAKE", "Bake", 2, "[]", 1),
            stage("PREP", "Fillings & Frostings", 1, "[]", 2),
            stage("STACK", "Stack & Fill", 1, r#"["BAKE","PREP"]"#, 3),
            stage("DECORATE", "Decorate", 0, r#"["STACK"]"#, 4),
        ],
        committed: vec![CommittedBatch::new("STACK", "Vanilla", day(4)?)
            .with_status(BatchStatus::Scheduled)
            .with_worker("Maria")
            .with_tier("T-1")],
    };

    let planner = ProductionPlanner::new(PlannerConfig::default());

    let listing = planner.list_batches(&source, &BatchQuery::new())?;
    println!("批次清單（共 {} 個）:", listing.summary.total);
    for batch in &listing.batches {
        println!(
            "  - {} [{}] 單元 {} 個, 最早交期 {:?}",
            batch.batch_id(),
            batch.stage_code(),
            batch.unit_ids().len(),
            batch.earliest_due()
        );
    }

    let result = planner.auto_schedule(&source, day(1).ok(), day(7).ok())?;
    println!("\n排程建議:");
    for suggestion in &result.suggestions {
        println!(
            "  - {} -> {} ({})",
            suggestion.batch_id, suggestion.suggested_date, suggestion.reason
        );
    }
    for warning in &result.warnings {
        println!("  ! {}: {}", warning.subject, warning.message);
    }

    let chain = planner.chain_for(&source, "BAKE-Vanilla")?;
    println!("\nBAKE-Vanilla 依賴鏈: {:?}", chain);

    Ok(())
}
