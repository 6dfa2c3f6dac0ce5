//! 工序（批次類型）配置與註冊表

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};


/// 解析 JSON 編碼的工序代碼清單
///
/// 格式錯誤時視為空清單，不中斷計算。
pub fn parse_stage_list(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(codes) => codes
            .into_iter()
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty())
            .collect(),
        Err(e) => {
            tracing::warn!("工序清單 JSON 格式錯誤，視為空清單: {} ({})", raw, e);
            Vec::new()
        }
    }
}

/// 工序配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTypeConfig {
    /// 工序代碼（唯一）
    pub code: String,

    /// 顯示名稱
    pub name: String,

    /// 提前期（天）
    pub lead_time_days: u32,

    /// 前置工序代碼
    pub depends_on: Vec<String>,

    /// 是否可合併多個需求為同一批次
    pub groupable: bool,

    /// 排序
    pub sort_order: i32,

    /// 是否啟用
    pub active: bool,

    /// 顯示顏色
    pub color: Option<String>,
}

impl BatchTypeConfig {
    /// 創建新的工序配置
    pub fn new(code: impl Into<String>, name: impl Into<String>, lead_time_days: u32) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            lead_time_days,
            depends_on: Vec::new(),
            groupable: true,
            sort_order: 0,
            active: true,
            color: None,
        }
    }

    /// 建構器模式：設置前置工序
    pub fn with_depends_on(mut self, codes: &[&str]) -> Self {
        self.depends_on = codes.iter().map(|c| c.to_string()).collect();
        self
    }

    /// 建構器模式：設置是否可合併
    pub fn with_groupable(mut self, groupable: bool) -> Self {
        self.groupable = groupable;
        self
    }

    /// 建構器模式：設置排序
    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    /// 建構器模式：設置啟用狀態
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// 建構器模式：設置顏色
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// 工序配置的原始資料列（dependsOn 為 JSON 字串）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTypeRecord {
    pub code: String,
    pub name: String,
    pub lead_time_days: i64,
    pub depends_on: Option<String>,
    pub groupable: bool,
    pub sort_order: i32,
    pub active: bool,
    pub color: Option<String>,
}

impl From<BatchTypeRecord> for BatchTypeConfig {
    fn from(record: BatchTypeRecord) -> Self {
        let lead_time_days = u32::try_from(record.lead_time_days).unwrap_or_else(|_| {
            tracing::warn!(
                "工序 {} 的提前期無效 ({})，改用 0",
                record.code,
                record.lead_time_days
            );
            0
        });

        Self {
            depends_on: record
                .depends_on
                .as_deref()
                .map(parse_stage_list)
                .unwrap_or_default(),
            code: record.code,
            name: record.name,
            lead_time_days,
            groupable: record.groupable,
            sort_order: record.sort_order,
            active: record.active,
            color: record.color,
        }
    }
}

/// 工序註冊表
///
/// 保存依 `sort_order`、代碼排序的工序配置；一次計算期間唯讀。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchTypeRegistry {
    configs: Vec<BatchTypeConfig>,
}

impl BatchTypeRegistry {
    /// 建立註冊表
    ///
    /// 依排序值排列；同一代碼只保留一列（啟用中的優先，其次排序在前者），
    /// 自我依賴與重複的前置工序會被移除。
    pub fn new(configs: Vec<BatchTypeConfig>) -> Self {
        let mut configs = configs;
        configs.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.code.cmp(&b.code)));

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut kept: Vec<BatchTypeConfig> = Vec::with_capacity(configs.len());

        for mut config in configs {
            if config.depends_on.iter().any(|dep| dep == &config.code) {
                tracing::warn!("工序 {} 依賴自身，已移除該依賴", config.code);
            }

            let mut unique = BTreeSet::new();
            let code = config.code.clone();
            config
                .depends_on
                .retain(|dep| dep != &code && unique.insert(dep.clone()));

            match index.get(&config.code) {
                None => {
                    index.insert(config.code.clone(), kept.len());
                    kept.push(config);
                }
                Some(&i) if !kept[i].active && config.active => {
                    tracing::warn!("重複的工序代碼 {}，以啟用中的配置取代停用的配置", config.code);
                    kept[i] = config;
                }
                Some(_) => {
                    tracing::warn!("重複的工序代碼 {}，忽略排序在後的配置", config.code);
                }
            }
        }

        kept.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.code.cmp(&b.code)));

        Self { configs: kept }
    }

    /// 從原始資料列建立
    pub fn from_records(records: Vec<BatchTypeRecord>) -> Self {
        Self::new(records.into_iter().map(BatchTypeConfig::from).collect())
    }

    /// 所有配置（含停用）
    pub fn configs(&self) -> &[BatchTypeConfig] {
        &self.configs
    }

    /// 啟用中的配置
    pub fn active(&self) -> impl Iterator<Item = &BatchTypeConfig> {
        self.configs.iter().filter(|c| c.active)
    }

    /// 只保留啟用中配置的副本
    pub fn active_only(&self) -> Self {
        Self {
            configs: self.active().cloned().collect(),
        }
    }

    /// 查詢啟用中的工序
    pub fn get(&self, code: &str) -> Option<&BatchTypeConfig> {
        self.active().find(|c| c.code == code)
    }

    pub fn is_active(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// 提前期；未知工序使用預設值
    pub fn lead_time(&self, code: &str, default_days: u32) -> u32 {
        self.get(code)
            .map(|c| c.lead_time_days)
            .unwrap_or(default_days)
    }

    /// 前置工序；未知工序為空
    pub fn prerequisites(&self, code: &str) -> &[String] {
        self.get(code).map(|c| c.depends_on.as_slice()).unwrap_or(&[])
    }

    /// 是否可合併；未知工序預設可合併
    pub fn is_groupable(&self, code: &str) -> bool {
        self.get(code).map(|c| c.groupable).unwrap_or(true)
    }

    /// 工序的標準順序位置，未知工序排在最後
    pub fn stage_rank(&self, code: &str) -> usize {
        self.active()
            .position(|c| c.code == code)
            .unwrap_or(usize::MAX)
    }

    /// 前置工序中不存在於註冊表的代碼
    pub fn unknown_prerequisites(&self) -> Vec<(String, String)> {
        let known: HashSet<&str> = self.configs.iter().map(|c| c.code.as_str()).collect();
        self.configs
            .iter()
            .flat_map(|c| {
                c.depends_on
                    .iter()
                    .filter(|dep| !known.contains(dep.as_str()))
                    .map(move |dep| (c.code.clone(), dep.clone()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn standard() -> Vec<BatchTypeConfig> {
        vec![
            BatchTypeConfig::new("DECORATE", "Decorate", 0)
                .with_depends_on(&["STACK"])
                .with_sort_order(4),
            BatchTypeConfig::new("BAKE", "Bake", 2).with_sort_order(1),
            BatchTypeConfig::new("STACK", "Stack", 1)
                .with_depends_on(&["BAKE", "PREP"])
                .with_groupable(false)
                .with_sort_order(3),
            BatchTypeConfig::new("PREP", "Prep", 3).with_sort_order(2),
        ]
    }

    #[rstest]
    #[case(r#"["BAKE","PREP"]"#, vec!["BAKE", "PREP"])]
    #[case(r#"[" BAKE ", ""]"#, vec!["BAKE"])]
    #[case("", vec![])]
    #[case("not-json", vec![])]
    #[case(r#"{"a":1}"#, vec![])]
    fn test_parse_stage_list(#[case] raw: &str, #[case] expected: Vec<&str>) {
        assert_eq!(parse_stage_list(raw), expected);
    }

    #[test]
    fn test_registry_sorted_by_sort_order() {
        let registry = BatchTypeRegistry::new(standard());
        let codes: Vec<_> = registry.configs().iter().map(|c| c.code.as_str()).collect();

        assert_eq!(codes, vec!["BAKE", "PREP", "STACK", "DECORATE"]);
        assert_eq!(registry.stage_rank("PREP"), 1);
        assert_eq!(registry.stage_rank("UNKNOWN"), usize::MAX);
    }

    #[test]
    fn test_duplicate_code_keeps_first_row() {
        let configs = vec![
            BatchTypeConfig::new("BAKE", "Bake again", 1).with_sort_order(5),
            BatchTypeConfig::new("BAKE", "Bake", 2).with_sort_order(1),
            BatchTypeConfig::new("PREP", "Prep", 3).with_sort_order(2),
        ];

        let registry = BatchTypeRegistry::new(configs);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("BAKE").unwrap().name, "Bake");
        assert_eq!(registry.lead_time("BAKE", 1), 2);
    }

    #[test]
    fn test_inactive_duplicate_does_not_shadow_active_row() {
        let configs = vec![
            BatchTypeConfig::new("BAKE", "Old bake", 4).with_sort_order(0).with_active(false),
            BatchTypeConfig::new("BAKE", "Bake", 2).with_sort_order(1),
            BatchTypeConfig::new("PREP", "Prep", 3).with_sort_order(2),
        ];

        let registry = BatchTypeRegistry::new(configs);

        assert!(registry.is_active("BAKE"));
        assert_eq!(registry.lead_time("BAKE", 1), 2);
        assert_eq!(registry.active_only().len(), 2);
    }

    #[test]
    fn test_self_dependency_removed() {
        let configs = vec![BatchTypeConfig::new("BAKE", "Bake", 2).with_depends_on(&["BAKE", "PREP", "PREP"])];
        let registry = BatchTypeRegistry::new(configs);

        assert_eq!(registry.prerequisites("BAKE"), &["PREP".to_string()]);
    }

    #[test]
    fn test_unknown_stage_defaults() {
        let registry = BatchTypeRegistry::new(standard());

        assert_eq!(registry.lead_time("GLAZE", 1), 1);
        assert!(registry.prerequisites("GLAZE").is_empty());
        assert!(registry.is_groupable("GLAZE"));
        assert!(!registry.is_groupable("STACK"));
    }

    #[test]
    fn test_inactive_stage_is_invisible() {
        let configs = vec![
            BatchTypeConfig::new("BAKE", "Bake", 2),
            BatchTypeConfig::new("PREP", "Prep", 3).with_active(false),
        ];
        let registry = BatchTypeRegistry::new(configs);

        assert!(registry.is_active("BAKE"));
        assert!(!registry.is_active("PREP"));
        assert_eq!(registry.lead_time("PREP", 1), 1);
        assert_eq!(registry.active_only().len(), 1);
    }

    #[test]
    fn test_from_records_tolerates_bad_json() {
        let records = vec![
            BatchTypeRecord {
                code: "STACK".to_string(),
                name: "Stack".to_string(),
                lead_time_days: 1,
                depends_on: Some("[BAKE".to_string()),
                groupable: false,
                sort_order: 3,
                active: true,
                color: None,
            },
            BatchTypeRecord {
                code: "BAKE".to_string(),
                name: "Bake".to_string(),
                lead_time_days: -4,
                depends_on: None,
                groupable: true,
                sort_order: 1,
                active: true,
                color: Some("#f4a261".to_string()),
            },
        ];
        let registry = BatchTypeRegistry::from_records(records);

        assert!(registry.prerequisites("STACK").is_empty());
        assert_eq!(registry.lead_time("BAKE", 1), 0);
    }

    #[test]
    fn test_unknown_prerequisites_reported() {
        let configs = vec![BatchTypeConfig::new("STACK", "Stack", 1).with_depends_on(&["BAKE"])];
        let registry = BatchTypeRegistry::new(configs);

        assert_eq!(
            registry.unknown_prerequisites(),
            vec![("STACK".to_string(), "BAKE".to_string())]
        );
    }
}
