//! 批次依賴鏈
//!
//! 兩個批次共用至少一個需求單元，且其中一個的工序是另一個的前置工序時，
//! 建立一條由前置批次指向後續批次的邊；依賴鏈即無向連通分量。

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rayon::prelude::*;

use bakery_core::{BatchView, DependencyEdge};

use crate::graph::StageGraph;

/// 依賴鏈解析器
pub struct DependencyResolver;

impl DependencyResolver {
    /// 建立批次依賴邊
    ///
    /// 輸出順序依後續批次在輸入中的順序，其次為前置工序順序、前置批次順序。
    pub fn build_edges<B>(batches: &[B], graph: &StageGraph) -> Vec<DependencyEdge>
    where
        B: BatchView + Sync,
    {
        let ids: Vec<String> = batches.iter().map(|b| b.batch_id()).collect();
        let units: Vec<BTreeSet<&str>> = batches.iter().map(|b| b.unit_ids()).collect();

        let per_batch: Vec<Vec<DependencyEdge>> = (0..batches.len())
            .into_par_iter()
            .map(|to| {
                let dependent = &batches[to];
                let mut edges = Vec::new();

                for prereq_stage in graph.prerequisites(dependent.stage_code()) {
                    for (from, prereq) in batches.iter().enumerate() {
                        if from == to || prereq.stage_code() != prereq_stage.as_str() {
                            continue;
                        }
                        if units[from].is_disjoint(&units[to]) {
                            continue;
                        }

                        edges.push(DependencyEdge {
                            from: ids[from].clone(),
                            to: ids[to].clone(),
                            from_stage: prereq_stage.clone(),
                            to_stage: dependent.stage_code().to_string(),
                            missing: Self::is_missing(prereq, dependent),
                        });
                    }
                }

                edges
            })
            .collect();

        let edges: Vec<DependencyEdge> = per_batch.into_iter().flatten().collect();
        tracing::debug!("批次依賴邊: {} 條", edges.len());
        edges
    }

    /// 後續批次已排定，但前置批次未排定或排得更晚
    fn is_missing<B: BatchView>(prereq: &B, dependent: &B) -> bool {
        match (prereq.scheduled_date(), dependent.scheduled_date()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(before), Some(after)) => before > after,
        }
    }

    /// 與指定批次連通的所有批次（含自身）
    ///
    /// 視邊為無向，以 BFS 求連通分量。
    pub fn chain_of(batch_id: &str, edges: &[DependencyEdge]) -> BTreeSet<String> {
        let adjacency = Self::adjacency(edges);

        let mut chain = BTreeSet::new();
        let mut queue = VecDeque::from([batch_id]);

        while let Some(current) = queue.pop_front() {
            if !chain.insert(current.to_string()) {
                continue;
            }
            if let Some(neighbors) = adjacency.get(current) {
                queue.extend(
                    neighbors
                        .iter()
                        .copied()
                        .filter(|n| !chain.contains(*n)),
                );
            }
        }

        chain
    }

    /// 所有依賴鏈；沒有任何邊的批次自成一條
    pub fn chains(batch_ids: &[String], edges: &[DependencyEdge]) -> Vec<BTreeSet<String>> {
        let mut assigned: BTreeSet<&str> = BTreeSet::new();
        let mut chains = Vec::new();

        for id in batch_ids {
            if assigned.contains(id.as_str()) {
                continue;
            }
            let chain = Self::chain_of(id, edges);
            for member in &chain {
                if let Some(known) = batch_ids.iter().find(|b| *b == member) {
                    assigned.insert(known.as_str());
                }
            }
            chains.push(chain);
        }

        chains
    }

    fn adjacency(edges: &[DependencyEdge]) -> BTreeMap<&str, Vec<&str>> {
        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for edge in edges {
            adjacency.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
            adjacency.entry(edge.to.as_str()).or_default().push(edge.from.as_str());
        }
        adjacency
    }
}
