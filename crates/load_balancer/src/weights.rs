//! 负载反比权重计算
//!
//! 深度不低于阈值的目标被排除；其余目标的原始权重为
//! `max(1, max_depth - depth + 1)`，再归一化。

use std::collections::BTreeMap;

use contracts::DestinationId;
use tracing::{debug, error};

use crate::sampler::LoadSnapshot;

/// 归一化权重表（仅在一次选择周期内有效）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    weights: BTreeMap<DestinationId, f64>,
}

impl WeightTable {
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn get(&self, destination: &str) -> Option<f64> {
        self.weights.get(destination).copied()
    }

    pub fn contains(&self, destination: &str) -> bool {
        self.weights.contains_key(destination)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DestinationId, f64)> {
        self.weights.iter().map(|(id, w)| (id, *w))
    }

    /// 权重之和（非空时为 1）
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}

/// 权重计算器
#[derive(Debug, Clone, Copy)]
pub struct WeightCalculator {
    threshold: u64,
}

impl WeightCalculator {
    /// `threshold`: 过载阈值，深度 >= 阈值的目标不可选
    pub fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// 基于负载快照计算权重
    pub fn calculate(&self, snapshot: &LoadSnapshot) -> WeightTable {
        calculate_weights(&snapshot.depths(), self.threshold)
    }
}

/// 计算归一化权重
///
/// 返回空表表示没有可用目标（输入为空或全部过载）。
pub fn calculate_weights(loads: &BTreeMap<DestinationId, u64>, threshold: u64) -> WeightTable {
    if loads.is_empty() {
        error!("No destination loads available, weight table is empty");
        return WeightTable::default();
    }

    let admissible: Vec<(&DestinationId, u64)> = loads
        .iter()
        .filter(|(_, depth)| **depth < threshold)
        .map(|(id, depth)| (id, *depth))
        .collect();

    let Some(max_depth) = admissible.iter().map(|(_, depth)| *depth).max() else {
        error!(
            destinations = loads.len(),
            threshold, "All destinations overloaded, weight table is empty"
        );
        return WeightTable::default();
    };

    let raw: Vec<(&DestinationId, f64)> = admissible
        .into_iter()
        .map(|(id, depth)| (id, (max_depth - depth + 1).max(1) as f64))
        .collect();
    let sum: f64 = raw.iter().map(|(_, w)| w).sum();

    let weights: BTreeMap<DestinationId, f64> = raw
        .into_iter()
        .map(|(id, w)| (id.clone(), w / sum))
        .collect();

    debug!(
        admissible = weights.len(),
        excluded = loads.len() - weights.len(),
        max_depth,
        "Weights calculated"
    );

    WeightTable { weights }
}
