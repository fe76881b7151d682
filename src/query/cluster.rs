use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::HierarchyGraph;

/// Gains at or below this threshold are treated as no improvement.
const GAIN_EPSILON: f64 = 1e-12;

/// Tuning knobs for community detection. Defaults are the engine's fixed constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterParams {
    /// Resolution γ in the modularity gain; lower values favour larger communities.
    pub resolution: f64,
    /// Seed for the xorshift32 visiting-order shuffle.
    pub seed: u32,
    /// Maximum number of outer (move + refine) rounds.
    pub max_levels: usize,
    /// Maximum number of local-moving passes per outer round.
    pub max_local_moves: usize,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            resolution: 0.3,
            seed: 42,
            max_levels: 50,
            max_local_moves: 20,
        }
    }
}

/// A partition of the node set into communities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Communities {
    /// Node position (snapshot order) -> community label.
    pub partition: Vec<usize>,
    /// Community label -> node positions, ascending.
    pub communities: Vec<Vec<usize>>,
    /// Final modularity Q of the partition.
    pub modularity: f64,
}

impl Communities {
    fn singletons(node_count: usize) -> Self {
        Self {
            partition: (0..node_count).collect(),
            communities: (0..node_count).map(|i| vec![i]).collect(),
            modularity: 0.0,
        }
    }
}

/// Cluster every node of the hierarchy, treating all edge kinds as one undirected multigraph.
pub fn detect_communities(graph: &HierarchyGraph, params: &ClusterParams) -> Communities {
    let positions: std::collections::HashMap<_, usize> = graph
        .graph
        .node_indices()
        .enumerate()
        .map(|(pos, idx)| (idx, pos))
        .collect();

    let edges: Vec<(usize, usize)> = graph
        .graph
        .edge_indices()
        .filter_map(|e| graph.graph.edge_endpoints(e))
        .map(|(src, dst)| (positions[&src], positions[&dst]))
        .collect();

    leiden(positions.len(), &edges, params)
}

/// Leiden-style single-resolution community detection over an edge list.
///
/// Deterministic for a given seed: every iteration order is fixed except the visiting
/// order, which comes from the seeded shuffle.
pub fn leiden(node_count: usize, edges: &[(usize, usize)], params: &ClusterParams) -> Communities {
    let adjacency = Adjacency::build(node_count, edges);
    if adjacency.m2 == 0 {
        tracing::debug!(nodes = node_count, "no edges; returning singleton partition");
        return Communities::singletons(node_count);
    }

    let mut labels: Vec<usize> = (0..node_count).collect();
    let mut rng = XorShift32::new(params.seed);

    for level in 0..params.max_levels {
        let mut round_moves = 0usize;
        let mut totals = community_totals(&labels, &adjacency.degree);

        for _ in 0..params.max_local_moves {
            let moved = local_moving_pass(&adjacency, &mut labels, &mut totals, params, &mut rng);
            round_moves += moved;
            if moved == 0 {
                break;
            }
        }

        labels = refine(&adjacency, &labels);
        tracing::debug!(level, moves = round_moves, "clustering round finished");

        if round_moves == 0 {
            break;
        }
    }

    let modularity = modularity(&adjacency, &labels, params.resolution);
    let community_count = labels.iter().max().map_or(0, |&max| max + 1);
    let mut communities: Vec<Vec<usize>> = vec![Vec::new(); community_count];
    for (node, &label) in labels.iter().enumerate() {
        communities[label].push(node);
    }

    tracing::info!(
        communities = communities.len(),
        modularity,
        "community detection complete"
    );

    Communities {
        partition: labels,
        communities,
        modularity,
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// Weight-accumulating undirected adjacency. `BTreeMap` keeps neighbour order stable.
struct Adjacency {
    neighbours: Vec<BTreeMap<usize, u64>>,
    degree: Vec<f64>,
    /// Twice the total edge weight.
    m2: u64,
}

impl Adjacency {
    fn build(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut neighbours: Vec<BTreeMap<usize, u64>> = vec![BTreeMap::new(); node_count];
        let mut m2 = 0u64;
        for &(a, b) in edges {
            if a == b {
                *neighbours[a].entry(a).or_insert(0) += 2;
            } else {
                *neighbours[a].entry(b).or_insert(0) += 1;
                *neighbours[b].entry(a).or_insert(0) += 1;
            }
            m2 += 2;
        }
        let degree = neighbours
            .iter()
            .map(|row| row.values().sum::<u64>() as f64)
            .collect();
        Self {
            neighbours,
            degree,
            m2,
        }
    }
}

fn community_totals(labels: &[usize], degree: &[f64]) -> Vec<f64> {
    let mut totals = vec![0.0; labels.len()];
    for (node, &label) in labels.iter().enumerate() {
        totals[label] += degree[node];
    }
    totals
}

/// One shuffled sweep over all nodes. Returns the number of nodes that changed community.
fn local_moving_pass(
    adjacency: &Adjacency,
    labels: &mut [usize],
    totals: &mut [f64],
    params: &ClusterParams,
    rng: &mut XorShift32,
) -> usize {
    let m2 = adjacency.m2 as f64;
    let mut order: Vec<usize> = (0..labels.len()).collect();
    rng.shuffle(&mut order);

    let mut moved = 0;
    for node in order {
        let current = labels[node];
        let degree = adjacency.degree[node];
        totals[current] -= degree;

        let mut links: BTreeMap<usize, f64> = BTreeMap::new();
        for (&other, &weight) in &adjacency.neighbours[node] {
            if other != node {
                *links.entry(labels[other]).or_insert(0.0) += weight as f64;
            }
        }

        let best = best_community(current, &links, |community, k_in| {
            move_gain(k_in, degree, totals[community], m2, params.resolution)
        });

        totals[best] += degree;
        if best != current {
            labels[node] = best;
            moved += 1;
        }
    }
    moved
}

/// `k_in − γ · degree · total / m2`, with `total` excluding the node itself.
fn move_gain(k_in: f64, degree: f64, total: f64, m2: f64, resolution: f64) -> f64 {
    k_in - resolution * degree * total / m2
}

/// Community a node should end up in, given its link weight to each neighbouring label.
///
/// A candidate must beat both `GAIN_EPSILON` and the best gain so far by more than
/// `GAIN_EPSILON`, so ties keep the current community or the lowest tied label.
fn best_community(
    current: usize,
    links: &BTreeMap<usize, f64>,
    gain: impl Fn(usize, f64) -> f64,
) -> usize {
    let mut best = current;
    let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
    for (&community, &k_in) in links {
        if community == current {
            continue;
        }
        let candidate = gain(community, k_in);
        if candidate > GAIN_EPSILON && candidate - best_gain > GAIN_EPSILON {
            best = community;
            best_gain = candidate;
        }
    }
    best
}

/// Split every label into its connected components over intra-label edges.
///
/// Labels are renumbered compactly in order of each component's lowest node.
fn refine(adjacency: &Adjacency, labels: &[usize]) -> Vec<usize> {
    const UNSET: usize = usize::MAX;
    let mut refined = vec![UNSET; labels.len()];
    let mut next_label = 0;

    for start in 0..labels.len() {
        if refined[start] != UNSET {
            continue;
        }
        refined[start] = next_label;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &other in adjacency.neighbours[node].keys() {
                if refined[other] == UNSET && labels[other] == labels[node] {
                    refined[other] = next_label;
                    stack.push(other);
                }
            }
        }
        next_label += 1;
    }
    refined
}

/// `Q = Σ_c (sumIn_c / m2 − γ · (sumTot_c / m2)²)`.
fn modularity(adjacency: &Adjacency, labels: &[usize], resolution: f64) -> f64 {
    let m2 = adjacency.m2 as f64;
    let mut sum_in: BTreeMap<usize, f64> = BTreeMap::new();
    let mut sum_tot: BTreeMap<usize, f64> = BTreeMap::new();

    for (node, row) in adjacency.neighbours.iter().enumerate() {
        let label = labels[node];
        *sum_tot.entry(label).or_insert(0.0) += adjacency.degree[node];
        let inside: u64 = row
            .iter()
            .filter(|&(&other, _)| labels[other] == label)
            .map(|(_, &w)| w)
            .sum();
        *sum_in.entry(label).or_insert(0.0) += inside as f64;
    }

    sum_tot
        .iter()
        .map(|(label, &tot)| {
            let inside = sum_in.get(label).copied().unwrap_or(0.0);
            inside / m2 - resolution * (tot / m2).powi(2)
        })
        .sum()
}

/// Marsaglia xorshift32. Zero is a fixed point, so a zero seed is replaced.
struct XorShift32(u32);

impl XorShift32 {
    fn new(seed: u32) -> Self {
        Self(if seed == 0 { 0x9E37_79B9 } else { seed })
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    /// Fisher–Yates.
    fn shuffle(&mut self, items: &mut [usize]) {
        for i in (1..items.len()).rev() {
            let j = (self.next_u32() as usize) % (i + 1);
            items.swap(i, j);
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge::EdgeKind;
    use crate::graph::node::NodeKind;
    use crate::graph::test_support::HierarchyBuilder;
    use proptest::prelude::*;

    fn two_triangles() -> Vec<(usize, usize)> {
        vec![(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)]
    }

    #[test]
    fn test_no_edges_gives_singletons() {
        let result = leiden(4, &[], &ClusterParams::default());
        assert_eq!(result.partition, vec![0, 1, 2, 3]);
        assert_eq!(result.communities, vec![vec![0], vec![1], vec![2], vec![3]]);
        assert_eq!(result.modularity, 0.0);
    }

    #[test]
    fn test_disconnected_triangles_form_two_communities() {
        let result = leiden(6, &two_triangles(), &ClusterParams::default());
        let p = &result.partition;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[3], p[4]);
        assert_eq!(p[4], p[5]);
        assert_ne!(p[0], p[3], "disconnected triangles must not share a community");
        assert_eq!(result.communities.len(), 2);
        // Each triangle: sumIn = 6, sumTot = 6, m2 = 12 → 2 · (0.5 − 0.3 · 0.25).
        assert!((result.modularity - 0.85).abs() < 1e-9, "got {}", result.modularity);
    }

    #[test]
    fn test_isolated_node_stays_alone() {
        let result = leiden(3, &[(0, 1)], &ClusterParams::default());
        assert_eq!(result.partition[0], result.partition[1]);
        assert_ne!(result.partition[2], result.partition[0]);
        assert_eq!(result.communities[result.partition[2]], vec![2]);
    }

    #[test]
    fn test_self_loops_count_twice() {
        let adjacency = Adjacency::build(2, &[(0, 0), (0, 1)]);
        assert_eq!(adjacency.m2, 4);
        assert_eq!(adjacency.degree, vec![3.0, 1.0]);
    }

    /// Gains for a degree-1 node in a graph with `m2 = 8` at the default resolution.
    fn unit_gain(totals: &[f64]) -> impl Fn(usize, f64) -> f64 + '_ {
        move |community, k_in| move_gain(k_in, 1.0, totals[community], 8.0, 0.3)
    }

    #[test]
    fn test_tied_candidates_go_to_lowest_label() {
        // Node alone in label 3; labels 1 and 2 offer identical gains.
        let totals = [0.0, 2.0, 2.0, 0.0];
        let links = BTreeMap::from([(2, 1.0), (1, 1.0)]);
        assert_eq!(best_community(3, &links, unit_gain(&totals)), 1);
    }

    #[test]
    fn test_candidate_equal_to_current_does_not_move() {
        let totals = [0.0, 2.0, 2.0];
        let links = BTreeMap::from([(1, 1.0), (2, 1.0)]);
        assert_eq!(best_community(2, &links, unit_gain(&totals)), 2);
    }

    #[test]
    fn test_gain_at_or_below_epsilon_is_rejected() {
        // degree 2, resolution 0.5, m2 8: gain = k_in - total / 8.
        let totals = [4.0, 8.0, 8.0 - 4e-12];
        let gain = |community: usize, k_in: f64| move_gain(k_in, 2.0, totals[community], 8.0, 0.5);
        // Current gain is -0.5; label 1 scores exactly 0.
        let zero = BTreeMap::from([(1, 1.0)]);
        assert_eq!(gain(1, 1.0), 0.0);
        assert_eq!(best_community(0, &zero, gain), 0);
        // Label 2 scores about 5e-13, still inside the epsilon band.
        let tiny = BTreeMap::from([(2, 1.0)]);
        assert!(gain(2, 1.0) > 0.0 && gain(2, 1.0) <= GAIN_EPSILON);
        assert_eq!(best_community(0, &tiny, gain), 0);
    }

    #[test]
    fn test_local_moving_pass_leaves_settled_partition_alone() {
        // Each node already shares a label with its only neighbour.
        let adjacency = Adjacency::build(4, &[(0, 1), (2, 3)]);
        let mut labels = vec![0, 0, 2, 2];
        let mut totals = community_totals(&labels, &adjacency.degree);
        let mut rng = XorShift32::new(42);
        let moved = local_moving_pass(
            &adjacency,
            &mut labels,
            &mut totals,
            &ClusterParams::default(),
            &mut rng,
        );
        assert_eq!(moved, 0);
        assert_eq!(labels, vec![0, 0, 2, 2]);
        assert_eq!(totals, vec![2.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_refine_splits_disconnected_label() {
        let adjacency = Adjacency::build(4, &[(0, 1), (2, 3)]);
        // Nodes 0..=2 share a label but 2 is only connected to 3 (another label).
        let refined = refine(&adjacency, &[7, 7, 7, 9]);
        assert_eq!(refined, vec![0, 0, 1, 2]);
    }

    #[test]
    fn test_xorshift_is_reproducible() {
        let mut a = XorShift32::new(42);
        let mut b = XorShift32::new(42);
        let mut items_a: Vec<usize> = (0..10).collect();
        let mut items_b = items_a.clone();
        a.shuffle(&mut items_a);
        b.shuffle(&mut items_b);
        assert_eq!(items_a, items_b);
        let mut sorted = items_a.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>(), "shuffle must be a permutation");
        assert_ne!(XorShift32::new(0).next_u32(), 0, "zero seed must not stall");
    }

    #[test]
    fn test_detect_communities_over_hierarchy_uses_all_edge_kinds() {
        let graph = HierarchyBuilder::new()
            .node("u", NodeKind::Usage, &["root"])
            .base("h1", &["u"])
            .base("h2", &["u"])
            .base("lonely", &[])
            .edge("h1", "h2", EdgeKind::DefUse)
            .build();
        let result = detect_communities(&graph, &ClusterParams::default());
        assert_eq!(result.partition.len(), 5);
        // "lonely" (position 4) has no edges at all.
        assert_eq!(result.communities[result.partition[4]], vec![4]);
        assert_eq!(
            result.partition[2], result.partition[3],
            "h1 and h2 close a triangle with u"
        );
    }

    proptest! {
        #[test]
        fn prop_clustering_is_deterministic(
            edges in proptest::collection::vec((0usize..12, 0usize..12), 0..40),
            seed in any::<u32>(),
        ) {
            let params = ClusterParams { seed, ..ClusterParams::default() };
            let first = leiden(12, &edges, &params);
            let second = leiden(12, &edges, &params);
            prop_assert_eq!(&first.partition, &second.partition);
            prop_assert_eq!(first.modularity.to_bits(), second.modularity.to_bits());
        }

        #[test]
        fn prop_partition_and_communities_agree(
            edges in proptest::collection::vec((0usize..10, 0usize..10), 0..30),
        ) {
            let result = leiden(10, &edges, &ClusterParams::default());
            let mut seen = 0;
            for (label, members) in result.communities.iter().enumerate() {
                prop_assert!(!members.is_empty());
                for &node in members {
                    prop_assert_eq!(result.partition[node], label);
                    seen += 1;
                }
            }
            prop_assert_eq!(seen, 10);
        }

        #[test]
        fn prop_edgeless_graph_is_trivial(n in 0usize..50) {
            let result = leiden(n, &[], &ClusterParams::default());
            prop_assert_eq!(result.communities.len(), n);
            prop_assert_eq!(result.modularity, 0.0);
        }
    }
}
