//! 排程引擎配置模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::demand::{OrderStatus, RecipeRole};
use crate::{stage, BakeryError};

/// 排程引擎參數配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    /// 未知工序的預設提前期（天）
    pub default_lead_time_days: u32,

    /// 外購糖霜關鍵字（比對時不分大小寫），命中者不進入備料批次
    pub purchased_frosting_keywords: Vec<String>,

    /// 麵糊配方對應的工序
    pub batter_stage: String,

    /// 餡料、糖霜等其他配方對應的工序
    pub prep_stage: String,

    /// 納入排程的訂單狀態
    pub schedulable_statuses: Vec<OrderStatus>,

    /// 預設蛋糕層高度（英吋）
    pub default_tier_height: Decimal,

    /// 每平方英吋表面積所需糖霜（克）
    pub frosting_grams_per_sq_inch: Decimal,
}

impl PlannerConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self {
            default_lead_time_days: 1,
            purchased_frosting_keywords: vec!["fondant".to_string()],
            batter_stage: stage::BAKE.to_string(),
            prep_stage: stage::PREP.to_string(),
            schedulable_statuses: vec![OrderStatus::Confirmed, OrderStatus::InProgress],
            default_tier_height: Decimal::from(4),
            frosting_grams_per_sq_inch: Decimal::new(25, 1),
        }
    }

    /// 從 JSON 載入配置，缺少的欄位使用預設值
    pub fn from_json_str(raw: &str) -> crate::Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| BakeryError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置預設提前期
    pub fn with_default_lead_time(mut self, days: u32) -> Self {
        self.default_lead_time_days = days;
        self
    }

    /// 建構器模式：設置外購糖霜關鍵字
    pub fn with_purchased_keywords(mut self, keywords: Vec<String>) -> Self {
        self.purchased_frosting_keywords = keywords;
        self
    }

    /// 建構器模式：設置納入排程的訂單狀態
    pub fn with_schedulable_statuses(mut self, statuses: Vec<OrderStatus>) -> Self {
        self.schedulable_statuses = statuses;
        self
    }

    /// 建構器模式：設置預設層高
    pub fn with_default_tier_height(mut self, height: Decimal) -> Self {
        self.default_tier_height = height;
        self
    }

    /// 檢查配置是否合理
    pub fn validate(&self) -> crate::Result<()> {
        if self.batter_stage.trim().is_empty() || self.prep_stage.trim().is_empty() {
            return Err(BakeryError::InvalidConfig("工序代碼不可為空".to_string()));
        }
        if self.default_tier_height <= Decimal::ZERO {
            return Err(BakeryError::InvalidConfig(format!(
                "層高必須大於 0: {}",
                self.default_tier_height
            )));
        }
        if self.frosting_grams_per_sq_inch < Decimal::ZERO {
            return Err(BakeryError::InvalidConfig(format!(
                "糖霜密度不可為負: {}",
                self.frosting_grams_per_sq_inch
            )));
        }
        Ok(())
    }

    /// 配方角色對應的工序代碼
    pub fn stage_for_role(&self, role: RecipeRole) -> &str {
        match role {
            RecipeRole::Batter => &self.batter_stage,
            RecipeRole::Filling | RecipeRole::Frosting | RecipeRole::Finish => &self.prep_stage,
        }
    }

    /// 檢查糖霜是否為外購品
    pub fn is_purchased_frosting(&self, recipe_name: &str) -> bool {
        let name = recipe_name.to_lowercase();
        self.purchased_frosting_keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && name.contains(&keyword.to_lowercase()))
    }

    /// 檢查訂單狀態是否納入排程
    pub fn is_schedulable(&self, status: OrderStatus) -> bool {
        self.schedulable_statuses.contains(&status)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new()
    }
}
