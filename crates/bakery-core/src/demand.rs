//! 生產需求模型（蛋糕層與庫存品生產任務）

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::batch_type::parse_stage_list;
use crate::geometry::GeometryEstimator;

/// 配方角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeRole {
    /// 麵糊
    Batter,
    /// 餡料
    Filling,
    /// 糖霜
    Frosting,
    /// 裝飾 / 其他成品配方
    Finish,
}

impl RecipeRole {
    /// 由配方分類字串推得角色，無法辨識者視為 Finish
    pub fn from_category(category: &str) -> Self {
        match category.trim().to_lowercase().as_str() {
            "batter" => RecipeRole::Batter,
            "filling" => RecipeRole::Filling,
            "frosting" | "icing" => RecipeRole::Frosting,
            _ => RecipeRole::Finish,
        }
    }
}

/// 訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

/// 蛋糕層需求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierDemand {
    /// 蛋糕層ID
    pub tier_id: String,

    /// 所屬訂單ID
    pub order_id: String,

    /// 客戶名稱
    pub customer_name: String,

    /// 交期
    pub due_at: NaiveDateTime,

    /// 是否外送
    pub is_delivery: bool,

    /// 尺寸描述（如 8"、10 inch）
    pub size: String,

    /// 份數
    pub servings: u32,

    /// 麵糊配方
    pub batter: Option<String>,

    /// 餡料配方
    pub filling: Option<String>,

    /// 糖霜配方
    pub frosting: Option<String>,

    /// 裝飾複雜度（1-3）
    pub complexity: u8,

    /// 表面積（平方英吋）
    pub surface_area: Decimal,

    /// 預估糖霜重量（克）
    pub frosting_mass: Decimal,

    /// 已有持久化批次的工序代碼
    pub assigned_stages: BTreeSet<String>,
}

impl TierDemand {
    /// 創建新的蛋糕層需求
    pub fn new(
        tier_id: impl Into<String>,
        order_id: impl Into<String>,
        due_at: NaiveDateTime,
        size: impl Into<String>,
        servings: u32,
    ) -> Self {
        Self {
            tier_id: tier_id.into(),
            order_id: order_id.into(),
            customer_name: String::new(),
            due_at,
            is_delivery: false,
            size: size.into(),
            servings,
            batter: None,
            filling: None,
            frosting: None,
            complexity: 1,
            surface_area: Decimal::ZERO,
            frosting_mass: Decimal::ZERO,
            assigned_stages: BTreeSet::new(),
        }
    }

    /// 建構器模式：設置客戶名稱
    pub fn with_customer(mut self, customer_name: impl Into<String>) -> Self {
        self.customer_name = customer_name.into();
        self
    }

    /// 建構器模式：設置外送
    pub fn with_delivery(mut self, is_delivery: bool) -> Self {
        self.is_delivery = is_delivery;
        self
    }

    /// 建構器模式：設置麵糊配方
    pub fn with_batter(mut self, recipe: impl Into<String>) -> Self {
        self.batter = Some(recipe.into());
        self
    }

    /// 建構器模式：設置餡料配方
    pub fn with_filling(mut self, recipe: impl Into<String>) -> Self {
        self.filling = Some(recipe.into());
        self
    }

    /// 建構器模式：設置糖霜配方
    pub fn with_frosting(mut self, recipe: impl Into<String>) -> Self {
        self.frosting = Some(recipe.into());
        self
    }

    /// 建構器模式：設置複雜度（限制在 1-3）
    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = complexity.clamp(1, 3);
        self
    }

    /// 建構器模式：直接設置表面積與糖霜重量
    pub fn with_measurements(mut self, surface_area: Decimal, frosting_mass: Decimal) -> Self {
        self.surface_area = surface_area;
        self.frosting_mass = frosting_mass;
        self
    }

    /// 建構器模式：標記某工序已有持久化批次
    pub fn with_assigned_stage(mut self, stage_code: impl Into<String>) -> Self {
        self.assigned_stages.insert(stage_code.into());
        self
    }

    /// 以幾何估算器計算表面積與糖霜重量
    pub fn estimate_with(mut self, estimator: &dyn GeometryEstimator, height: Decimal) -> Self {
        match estimator.diameter_of(&self.size) {
            Some(diameter) => {
                self.surface_area = estimator.surface_area(diameter, height);
                self.frosting_mass = estimator.frosting_mass(diameter, height, self.complexity);
            }
            None => {
                tracing::warn!("無法解析蛋糕層 {} 的尺寸: {}", self.tier_id, self.size);
            }
        }
        self
    }

    /// 檢查該工序是否已有持久化批次
    pub fn is_assigned_to(&self, stage_code: &str) -> bool {
        self.assigned_stages.contains(stage_code)
    }
}

/// 庫存品與配方的關聯
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecipeLink {
    /// 配方名稱
    pub recipe_name: String,

    /// 配方分類（batter / filling / frosting ...）
    pub category: String,

    /// 每單位用量（克）
    pub quantity_per_unit: Decimal,
}

impl StockRecipeLink {
    pub fn new(
        recipe_name: impl Into<String>,
        category: impl Into<String>,
        quantity_per_unit: Decimal,
    ) -> Self {
        Self {
            recipe_name: recipe_name.into(),
            category: category.into(),
            quantity_per_unit,
        }
    }

    /// 配方角色
    pub fn role(&self) -> RecipeRole {
        RecipeRole::from_category(&self.category)
    }
}

/// 庫存品生產需求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockDemand {
    /// 生產任務ID
    pub task_id: String,

    /// 庫存品ID
    pub item_id: String,

    /// 庫存品名稱
    pub item_name: String,

    /// 目標數量
    pub target_quantity: Decimal,

    /// 預定日期
    pub scheduled_date: Option<NaiveDate>,

    /// 關聯配方
    pub recipes: Vec<StockRecipeLink>,
}

impl StockDemand {
    /// 創建新的庫存品生產需求
    pub fn new(
        task_id: impl Into<String>,
        item_id: impl Into<String>,
        item_name: impl Into<String>,
        target_quantity: Decimal,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            item_id: item_id.into(),
            item_name: item_name.into(),
            target_quantity,
            scheduled_date: None,
            recipes: Vec::new(),
        }
    }

    /// 建構器模式：設置預定日期
    pub fn with_scheduled_date(mut self, date: NaiveDate) -> Self {
        self.scheduled_date = Some(date);
        self
    }

    /// 建構器模式：添加配方關聯
    pub fn with_recipe(mut self, link: StockRecipeLink) -> Self {
        self.recipes.push(link);
        self
    }

    /// 某配方的總用量 = 每單位用量 × 目標數量
    pub fn recipe_mass(&self, link: &StockRecipeLink) -> Decimal {
        link.quantity_per_unit * self.target_quantity
    }

    /// 用於比較交期的時間點（預定日期當天零時）
    pub fn due_at(&self) -> Option<NaiveDateTime> {
        self.scheduled_date.and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}

/// 生產需求單元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DemandUnit {
    Tier(TierDemand),
    Stock(StockDemand),
}

impl DemandUnit {
    /// 需求單元ID（蛋糕層ID 或生產任務ID）
    pub fn unit_id(&self) -> &str {
        match self {
            DemandUnit::Tier(tier) => &tier.tier_id,
            DemandUnit::Stock(stock) => &stock.task_id,
        }
    }

    /// 交期；未排定日期的庫存任務沒有交期
    pub fn due_at(&self) -> Option<NaiveDateTime> {
        match self {
            DemandUnit::Tier(tier) => Some(tier.due_at),
            DemandUnit::Stock(stock) => stock.due_at(),
        }
    }
}

impl From<TierDemand> for DemandUnit {
    fn from(tier: TierDemand) -> Self {
        DemandUnit::Tier(tier)
    }
}

impl From<StockDemand> for DemandUnit {
    fn from(stock: StockDemand) -> Self {
        DemandUnit::Stock(stock)
    }
}

/// 訂單（含蛋糕層與急單跳過清單）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDemand {
    /// 訂單ID
    pub order_id: String,

    /// 客戶名稱
    pub customer_name: String,

    /// 訂單狀態
    pub status: OrderStatus,

    /// 是否急單
    pub is_rush: bool,

    /// 急單可跳過的工序（JSON 編碼的字串陣列）
    pub rush_skip_stages: Option<String>,

    /// 蛋糕層
    pub tiers: Vec<TierDemand>,
}

impl OrderDemand {
    /// 創建新的訂單
    pub fn new(order_id: impl Into<String>, status: OrderStatus) -> Self {
        Self {
            order_id: order_id.into(),
            customer_name: String::new(),
            status,
            is_rush: false,
            rush_skip_stages: None,
            tiers: Vec::new(),
        }
    }

    /// 建構器模式：設置客戶名稱
    pub fn with_customer(mut self, customer_name: impl Into<String>) -> Self {
        self.customer_name = customer_name.into();
        self
    }

    /// 建構器模式：標記為急單並設置跳過清單（原始 JSON）
    pub fn with_rush(mut self, skip_json: impl Into<String>) -> Self {
        self.is_rush = true;
        self.rush_skip_stages = Some(skip_json.into());
        self
    }

    /// 建構器模式：添加蛋糕層，未填客戶名稱時沿用訂單的
    pub fn with_tier(mut self, mut tier: TierDemand) -> Self {
        tier.order_id = self.order_id.clone();
        if tier.customer_name.is_empty() {
            tier.customer_name = self.customer_name.clone();
        }
        self.tiers.push(tier);
        self
    }

    /// 解析後的急單跳過工序；非急單或 JSON 格式錯誤時為空
    pub fn skip_stages(&self) -> BTreeSet<String> {
        if !self.is_rush {
            return BTreeSet::new();
        }
        self.rush_skip_stages
            .as_deref()
            .map(parse_stage_list)
            .unwrap_or_default()
            .into_iter()
            .collect()
    }
}
