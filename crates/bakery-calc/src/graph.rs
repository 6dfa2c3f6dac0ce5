//! 工序依賴圖
//!
//! 由工序配置推得：工序代碼 → 前置工序代碼。

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use bakery_core::{BakeryError, BatchTypeRegistry};

/// 工序依賴圖（鄰接表）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageGraph {
    prerequisites: BTreeMap<String, Vec<String>>,
}

impl StageGraph {
    /// 由註冊表中啟用的工序建立
    ///
    /// 被引用的前置工序一定會出現在鍵中（可能是空清單），查詢不會失敗。
    pub fn build(registry: &BatchTypeRegistry) -> Self {
        let mut prerequisites: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for config in registry.active() {
            prerequisites
                .entry(config.code.clone())
                .or_default()
                .extend(config.depends_on.iter().cloned());

            for dep in &config.depends_on {
                prerequisites.entry(dep.clone()).or_default();
            }
        }

        Self { prerequisites }
    }

    /// 前置工序；未知工序為空
    pub fn prerequisites(&self, stage_code: &str) -> &[String] {
        self.prerequisites
            .get(stage_code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, stage_code: &str) -> bool {
        self.prerequisites.contains_key(stage_code)
    }

    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.prerequisites.keys().map(String::as_str)
    }

    /// 鄰接表
    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.prerequisites
    }

    /// 所有直接或間接的前置工序（不含自身）
    pub fn transitive_prerequisites(&self, stage_code: &str) -> BTreeSet<String> {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<&str> = self.prerequisites(stage_code).iter().map(String::as_str).collect();

        while let Some(stage) = queue.pop_front() {
            if stage == stage_code || !visited.insert(stage.to_string()) {
                continue;
            }
            queue.extend(self.prerequisites(stage).iter().map(String::as_str));
        }

        visited
    }

    /// 偵測循環依賴
    ///
    /// DFS 並追蹤遞迴堆疊；找到回邊時回傳循環路徑（首尾相同）。
    pub fn detect_cycle(&self) -> Option<Vec<String>> {
        let mut visited = BTreeSet::new();
        let mut stack: Vec<&str> = Vec::new();

        for stage in self.prerequisites.keys() {
            if !visited.contains(stage.as_str()) {
                if let Some(cycle) = self.cycle_dfs(stage, &mut visited, &mut stack) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    fn cycle_dfs<'a>(
        &'a self,
        stage: &'a str,
        visited: &mut BTreeSet<&'a str>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        visited.insert(stage);
        stack.push(stage);

        for next in self.prerequisites(stage) {
            if let Some(pos) = stack.iter().position(|s| *s == next.as_str()) {
                let mut cycle: Vec<String> = stack[pos..].iter().map(|s| s.to_string()).collect();
                cycle.push(next.clone());
                return Some(cycle);
            }
            if !visited.contains(next.as_str()) {
                if let Some(cycle) = self.cycle_dfs(next, visited, stack) {
                    return Some(cycle);
                }
            }
        }

        stack.pop();
        None
    }

    /// 驗證沒有循環依賴
    pub fn validate(&self) -> bakery_core::Result<()> {
        match self.detect_cycle() {
            Some(cycle) => Err(BakeryError::CyclicDependency(cycle)),
            None => Ok(()),
        }
    }

    /// 拓撲順序（前置工序在前）
    pub fn topological_order(&self) -> bakery_core::Result<Vec<String>> {
        self.validate()?;

        let mut remaining: BTreeMap<&str, usize> = self
            .prerequisites
            .iter()
            .map(|(stage, deps)| (stage.as_str(), deps.len()))
            .collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (stage, deps) in &self.prerequisites {
            for dep in deps {
                dependents.entry(dep.as_str()).or_default().push(stage.as_str());
            }
        }

        let mut ready: VecDeque<&str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(stage, _)| *stage)
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while let Some(stage) = ready.pop_front() {
            order.push(stage.to_string());
            for next in dependents.get(stage).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(next) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(*next);
                    }
                }
            }
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_core::BatchTypeConfig;

    fn graph(configs: Vec<BatchTypeConfig>) -> StageGraph {
        StageGraph::build(&BatchTypeRegistry::new(configs))
    }

    fn standard() -> StageGraph {
        graph(vec![
            BatchTypeConfig::new("BAKE", "Bake", 2).with_sort_order(1),
            BatchTypeConfig::new("PREP", "Prep", 3).with_sort_order(2),
            BatchTypeConfig::new("STACK", "Stack", 1)
                .with_depends_on(&["BAKE", "PREP"])
                .with_sort_order(3),
            BatchTypeConfig::new("DECORATE", "Decorate", 1)
                .with_depends_on(&["STACK"])
                .with_sort_order(4),
        ])
    }

    #[test]
    fn test_build_adjacency() {
        let graph = standard();

        assert_eq!(graph.prerequisites("STACK"), &["BAKE".to_string(), "PREP".to_string()]);
        assert!(graph.prerequisites("BAKE").is_empty());
        assert!(graph.prerequisites("UNKNOWN").is_empty());
    }

    #[test]
    fn test_referenced_prerequisite_becomes_key() {
        let graph = graph(vec![BatchTypeConfig::new("STACK", "Stack", 1).with_depends_on(&["BAKE"])]);

        assert!(graph.contains("BAKE"));
        assert!(graph.prerequisites("BAKE").is_empty());
    }

    #[test]
    fn test_inactive_stage_excluded() {
        let graph = graph(vec![
            BatchTypeConfig::new("BAKE", "Bake", 2),
            BatchTypeConfig::new("GLAZE", "Glaze", 1)
                .with_depends_on(&["BAKE"])
                .with_active(false),
        ]);

        assert!(!graph.contains("GLAZE"));
    }

    #[test]
    fn test_transitive_prerequisites() {
        let deps = standard().transitive_prerequisites("DECORATE");
        let expected: BTreeSet<String> = ["BAKE", "PREP", "STACK"].iter().map(|s| s.to_string()).collect();

        assert_eq!(deps, expected);
    }

    #[test]
    fn test_acyclic_graph_validates() {
        let graph = standard();

        assert!(graph.detect_cycle().is_none());
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        let graph = graph(vec![
            BatchTypeConfig::new("A", "A", 1).with_depends_on(&["B"]),
            BatchTypeConfig::new("B", "B", 1).with_depends_on(&["C"]),
            BatchTypeConfig::new("C", "C", 1).with_depends_on(&["A"]),
        ]);

        let cycle = graph.detect_cycle().unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
        assert!(matches!(graph.validate(), Err(BakeryError::CyclicDependency(_))));
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn test_topological_order() {
        let order = standard().topological_order().unwrap();
        let position = |code: &str| order.iter().position(|s| s == code).unwrap();

        assert_eq!(order.len(), 4);
        assert!(position("BAKE") < position("STACK"));
        assert!(position("PREP") < position("STACK"));
        assert!(position("STACK") < position("DECORATE"));
    }
}
