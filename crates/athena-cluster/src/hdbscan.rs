//! Hierarchical density-based clustering (HDBSCAN).
//!
//! The fit runs in five stages over Euclidean distances:
//!
//! 1. core distance of every point (distance to its `min_samples`-th
//!    nearest neighbour, counting the point itself),
//! 2. a minimum spanning tree over mutual reachability distances,
//! 3. a single-linkage hierarchy built from the sorted tree edges,
//! 4. the condensed tree, where splits smaller than `min_cluster_size`
//!    are treated as points falling out of their parent,
//! 5. flat cluster selection (leaf or excess of mass), optionally merged
//!    upward until clusters are at least `cluster_selection_epsilon` apart.
//!
//! Points not covered by a selected cluster are labelled [`NOISE`].
//! Distance passes are O(n²), which is fine for the few thousand messages
//! a chat window produces.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::{ClusterError, Result};
use crate::matrix::FeatureMatrix;

/// Label given to points that belong to no cluster.
pub const NOISE: i32 = -1;

/// How flat clusters are extracted from the condensed tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterSelectionMethod {
    /// Excess of mass: keep the most persistent clusters.
    Eom,
    /// Leaves of the cluster tree: many small, homogeneous clusters.
    #[default]
    Leaf,
}

impl ClusterSelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterSelectionMethod::Eom => "eom",
            ClusterSelectionMethod::Leaf => "leaf",
        }
    }
}

impl std::str::FromStr for ClusterSelectionMethod {
    type Err = ClusterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "eom" => Ok(ClusterSelectionMethod::Eom),
            "leaf" => Ok(ClusterSelectionMethod::Leaf),
            other => Err(ClusterError::invalid_parameter(format!(
                "unknown cluster selection method '{other}', expected 'eom' or 'leaf'"
            ))),
        }
    }
}

/// Parameters for [`Hdbscan`].
#[derive(Debug, Clone, PartialEq)]
pub struct HdbscanParams {
    /// Smallest group that counts as a cluster.
    pub min_cluster_size: usize,
    /// Neighbourhood size used for core distances.
    pub min_samples: usize,
    /// Clusters born closer than this are merged into their parent.
    pub cluster_selection_epsilon: f64,
    pub cluster_selection_method: ClusterSelectionMethod,
    /// Allow the root to be selected as the only cluster.
    pub allow_single_cluster: bool,
}

impl Default for HdbscanParams {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
            min_samples: 2,
            cluster_selection_epsilon: 0.7,
            cluster_selection_method: ClusterSelectionMethod::Leaf,
            allow_single_cluster: false,
        }
    }
}

impl HdbscanParams {
    #[must_use]
    pub fn with_min_cluster_size(mut self, size: usize) -> Self {
        self.min_cluster_size = size;
        self
    }

    #[must_use]
    pub fn with_min_samples(mut self, samples: usize) -> Self {
        self.min_samples = samples;
        self
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.cluster_selection_epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_selection_method(mut self, method: ClusterSelectionMethod) -> Self {
        self.cluster_selection_method = method;
        self
    }

    #[must_use]
    pub fn with_allow_single_cluster(mut self, allow: bool) -> Self {
        self.allow_single_cluster = allow;
        self
    }

    /// Validate parameters.
    ///
    /// # Errors
    ///
    /// Returns `ClusterError::InvalidParameter` if:
    /// - min_cluster_size < 2
    /// - min_samples < 1
    /// - cluster_selection_epsilon is negative or not finite
    pub fn validate(&self) -> Result<()> {
        if self.min_cluster_size < 2 {
            return Err(ClusterError::invalid_parameter(format!(
                "min_cluster_size must be >= 2, got {}",
                self.min_cluster_size
            )));
        }
        if self.min_samples < 1 {
            return Err(ClusterError::invalid_parameter(
                "min_samples must be >= 1, got 0",
            ));
        }
        if !self.cluster_selection_epsilon.is_finite() || self.cluster_selection_epsilon < 0.0 {
            return Err(ClusterError::invalid_parameter(format!(
                "cluster_selection_epsilon must be a finite value >= 0, got {}",
                self.cluster_selection_epsilon
            )));
        }
        Ok(())
    }
}

/// One merge of the single-linkage hierarchy. Node `n + k` is merge `k`.
#[derive(Debug, Clone, Copy)]
struct MergeStep {
    left: usize,
    right: usize,
    distance: f64,
    size: usize,
}

/// Edge of the condensed tree. Children below `n` are points.
#[derive(Debug, Clone, Copy)]
struct CondensedEdge {
    parent: usize,
    child: usize,
    lambda: f64,
    size: usize,
}

/// HDBSCAN clusterer with fixed parameters.
#[derive(Debug, Clone)]
pub struct Hdbscan {
    params: HdbscanParams,
}

impl Hdbscan {
    /// # Errors
    /// Returns `ClusterError::InvalidParameter` for unusable parameters.
    pub fn new(params: HdbscanParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &HdbscanParams {
        &self.params
    }

    /// Label every row of `data`: `0..k` for clusters, [`NOISE`] otherwise.
    ///
    /// Cluster ids are ordered by their position in the condensed tree, so
    /// the same input always yields the same labels.
    pub fn fit(&self, data: &FeatureMatrix) -> Vec<i32> {
        let n = data.nrows();
        if n == 0 {
            return Vec::new();
        }
        if n < self.params.min_cluster_size {
            debug!(
                points = n,
                min_cluster_size = self.params.min_cluster_size,
                "Too few points to form a cluster"
            );
            return vec![NOISE; n];
        }

        let core = core_distances(data, self.params.min_samples);
        let edges = minimum_spanning_tree(data, &core);
        let merges = single_linkage(n, edges);
        let tree = condense(n, &merges, self.params.min_cluster_size);
        let selected = self.select_clusters(n, &tree);
        let labels = label_points(n, &tree, &selected);

        debug!(
            points = n,
            clusters = selected.len(),
            noise = labels.iter().filter(|&&l| l == NOISE).count(),
            "HDBSCAN fit complete"
        );
        labels
    }

    fn select_clusters(&self, n: usize, tree: &[CondensedEdge]) -> BTreeSet<usize> {
        let root = n;
        let view = ClusterTree::new(root, tree);

        if view.children.is_empty() {
            let single = self.params.allow_single_cluster
                && self.params.cluster_selection_method == ClusterSelectionMethod::Eom;
            return if single {
                BTreeSet::from([root])
            } else {
                BTreeSet::new()
            };
        }

        let candidates = match self.params.cluster_selection_method {
            ClusterSelectionMethod::Leaf => view.leaves(),
            ClusterSelectionMethod::Eom => self.excess_of_mass(&view, tree),
        };

        if self.params.cluster_selection_epsilon > 0.0 {
            self.epsilon_search(&view, candidates)
        } else {
            candidates
        }
    }

    fn excess_of_mass(&self, view: &ClusterTree, tree: &[CondensedEdge]) -> BTreeSet<usize> {
        let mut stability: BTreeMap<usize, f64> = BTreeMap::new();
        stability.insert(view.root, 0.0);
        for cluster in view.parent.keys() {
            stability.insert(*cluster, 0.0);
        }
        for edge in tree {
            let birth = view.birth_lambda(edge.parent);
            let excess = if edge.lambda.is_infinite() && birth.is_infinite() {
                0.0
            } else {
                edge.lambda - birth
            };
            *stability.entry(edge.parent).or_insert(0.0) += excess * edge.size as f64;
        }

        let nodes: Vec<usize> = stability
            .keys()
            .rev()
            .copied()
            .filter(|&c| c != view.root || self.params.allow_single_cluster)
            .collect();
        let mut is_cluster: BTreeMap<usize, bool> = nodes.iter().map(|&c| (c, true)).collect();

        // Highest ids first, so children are settled before their parents.
        for &node in &nodes {
            let subtree: f64 = view
                .children_of(node)
                .iter()
                .map(|child| stability.get(child).copied().unwrap_or(0.0))
                .sum();
            let own = stability.get(&node).copied().unwrap_or(0.0);
            if subtree > own {
                is_cluster.insert(node, false);
                stability.insert(node, subtree);
            } else {
                for sub in view.descendants(node) {
                    if sub != node {
                        is_cluster.insert(sub, false);
                    }
                }
            }
        }

        is_cluster
            .into_iter()
            .filter_map(|(c, keep)| keep.then_some(c))
            .collect()
    }

    /// Replace clusters born below epsilon with their nearest ancestor that
    /// was born above it.
    fn epsilon_search(&self, view: &ClusterTree, candidates: BTreeSet<usize>) -> BTreeSet<usize> {
        let epsilon = self.params.cluster_selection_epsilon;
        let mut selected = BTreeSet::new();
        let mut processed = BTreeSet::new();

        for cluster in candidates {
            let birth_eps = 1.0 / view.birth_lambda(cluster);
            if birth_eps < epsilon {
                if processed.contains(&cluster) {
                    continue;
                }
                let chosen = self.traverse_upwards(view, cluster);
                selected.insert(chosen);
                for sub in view.descendants(chosen) {
                    if sub != chosen {
                        processed.insert(sub);
                    }
                }
            } else {
                selected.insert(cluster);
            }
        }
        selected
    }

    fn traverse_upwards(&self, view: &ClusterTree, mut cluster: usize) -> usize {
        let epsilon = self.params.cluster_selection_epsilon;
        loop {
            let parent = match view.parent.get(&cluster) {
                Some(&p) => p,
                None => return cluster,
            };
            if parent == view.root {
                return if self.params.allow_single_cluster {
                    parent
                } else {
                    cluster
                };
            }
            if 1.0 / view.birth_lambda(parent) > epsilon {
                return parent;
            }
            cluster = parent;
        }
    }
}

/// The cluster-only part of a condensed tree.
struct ClusterTree {
    root: usize,
    parent: BTreeMap<usize, usize>,
    children: BTreeMap<usize, Vec<usize>>,
    birth: BTreeMap<usize, f64>,
}

impl ClusterTree {
    fn new(root: usize, tree: &[CondensedEdge]) -> Self {
        let mut parent = BTreeMap::new();
        let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut birth = BTreeMap::new();
        for edge in tree.iter().filter(|e| e.size > 1) {
            parent.insert(edge.child, edge.parent);
            children.entry(edge.parent).or_default().push(edge.child);
            birth.insert(edge.child, edge.lambda);
        }
        Self {
            root,
            parent,
            children,
            birth,
        }
    }

    fn birth_lambda(&self, cluster: usize) -> f64 {
        self.birth.get(&cluster).copied().unwrap_or(0.0)
    }

    fn children_of(&self, cluster: usize) -> &[usize] {
        self.children.get(&cluster).map_or(&[], Vec::as_slice)
    }

    fn leaves(&self) -> BTreeSet<usize> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&c| c != self.root && self.children_of(c).is_empty())
            .collect()
    }

    /// `cluster` and every cluster below it, breadth first.
    fn descendants(&self, cluster: usize) -> Vec<usize> {
        let mut order = vec![cluster];
        let mut i = 0;
        while i < order.len() {
            let node = order[i];
            order.extend_from_slice(self.children_of(node));
            i += 1;
        }
        order
    }
}

fn core_distances(data: &FeatureMatrix, min_samples: usize) -> Vec<f64> {
    let n = data.nrows();
    let k = (min_samples.max(1) - 1).min(n - 1);
    (0..n)
        .map(|i| {
            let mut dists: Vec<f64> = (0..n).map(|j| data.distance(i, j)).collect();
            dists.select_nth_unstable_by(k, |a, b| a.total_cmp(b));
            dists[k]
        })
        .collect()
}

/// Prim's algorithm over mutual reachability distances.
fn minimum_spanning_tree(data: &FeatureMatrix, core: &[f64]) -> Vec<(usize, usize, f64)> {
    let n = data.nrows();
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut from = vec![0usize; n];
    let mut edges = Vec::with_capacity(n.saturating_sub(1));

    let mut current = 0;
    for _ in 1..n {
        in_tree[current] = true;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let reach = data.distance(current, j).max(core[current]).max(core[j]);
            if reach < best[j] {
                best[j] = reach;
                from[j] = current;
            }
        }

        let mut next = None;
        for j in 0..n {
            if !in_tree[j] && next.map_or(true, |m: usize| best[j] < best[m]) {
                next = Some(j);
            }
        }
        let Some(next) = next else { break };
        edges.push((from[next], next, best[next]));
        current = next;
    }
    edges
}

fn single_linkage(n: usize, mut edges: Vec<(usize, usize, f64)>) -> Vec<MergeStep> {
    edges.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut parent: Vec<usize> = (0..2 * n - 1).collect();
    let mut size = vec![1usize; 2 * n - 1];
    let mut merges = Vec::with_capacity(n - 1);

    for (k, (a, b, distance)) in edges.into_iter().enumerate() {
        let left = find_root(&mut parent, a);
        let right = find_root(&mut parent, b);
        let node = n + k;
        parent[left] = node;
        parent[right] = node;
        size[node] = size[left] + size[right];
        merges.push(MergeStep {
            left,
            right,
            distance,
            size: size[node],
        });
    }
    merges
}

fn find_root(parent: &mut [usize], mut x: usize) -> usize {
    let mut root = x;
    while parent[root] != root {
        root = parent[root];
    }
    while parent[x] != root {
        let next = parent[x];
        parent[x] = root;
        x = next;
    }
    root
}

/// Hierarchy nodes below `node`, breadth first, including `node`.
fn hierarchy_bfs(n: usize, merges: &[MergeStep], node: usize) -> Vec<usize> {
    let mut order = vec![node];
    let mut i = 0;
    while i < order.len() {
        let current = order[i];
        if current >= n {
            let step = &merges[current - n];
            order.push(step.left);
            order.push(step.right);
        }
        i += 1;
    }
    order
}

fn condense(n: usize, merges: &[MergeStep], min_cluster_size: usize) -> Vec<CondensedEdge> {
    let root = 2 * n - 2;
    let node_size = |node: usize| if node < n { 1 } else { merges[node - n].size };

    let mut relabel = vec![0usize; 2 * n - 1];
    relabel[root] = n;
    let mut next_label = n + 1;
    let mut ignore = vec![false; 2 * n - 1];
    let mut tree = Vec::new();

    for node in hierarchy_bfs(n, merges, root) {
        if node < n || ignore[node] {
            continue;
        }
        let step = merges[node - n];
        let lambda = if step.distance > 0.0 {
            1.0 / step.distance
        } else {
            f64::INFINITY
        };
        let parent = relabel[node];
        let left_size = node_size(step.left);
        let right_size = node_size(step.right);

        let mut fall_out = |subtree: usize, tree: &mut Vec<CondensedEdge>| {
            for sub in hierarchy_bfs(n, merges, subtree) {
                if sub < n {
                    tree.push(CondensedEdge {
                        parent,
                        child: sub,
                        lambda,
                        size: 1,
                    });
                }
                ignore[sub] = true;
            }
        };

        match (left_size >= min_cluster_size, right_size >= min_cluster_size) {
            (true, true) => {
                for (child, child_size) in [(step.left, left_size), (step.right, right_size)] {
                    relabel[child] = next_label;
                    tree.push(CondensedEdge {
                        parent,
                        child: next_label,
                        lambda,
                        size: child_size,
                    });
                    next_label += 1;
                }
            }
            (false, false) => {
                fall_out(step.left, &mut tree);
                fall_out(step.right, &mut tree);
            }
            (false, true) => {
                fall_out(step.left, &mut tree);
                relabel[step.right] = parent;
            }
            (true, false) => {
                fall_out(step.right, &mut tree);
                relabel[step.left] = parent;
            }
        }
    }
    tree
}

fn label_points(n: usize, tree: &[CondensedEdge], selected: &BTreeSet<usize>) -> Vec<i32> {
    let root = n;
    let label_of: BTreeMap<usize, i32> = selected
        .iter()
        .enumerate()
        .map(|(label, &cluster)| (cluster, label as i32))
        .collect();
    let parent_of: BTreeMap<usize, usize> = tree.iter().map(|e| (e.child, e.parent)).collect();

    (0..n)
        .map(|point| {
            let mut node = match parent_of.get(&point) {
                Some(&p) => p,
                None => return NOISE,
            };
            loop {
                if let Some(&label) = label_of.get(&node) {
                    return label;
                }
                if node == root {
                    return NOISE;
                }
                node = match parent_of.get(&node) {
                    Some(&p) => p,
                    None => return NOISE,
                };
            }
        })
        .collect()
}
