//! Deterministic kd-tree with bounded best-bin-first search.

use super::detect::{Descriptor, DESCRIPTOR_LEN};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

const LEAF_SIZE: usize = 8;

/// Leaf points examined before the search settles for its current answer.
pub const DEFAULT_CHECKS: usize = 50;

enum Node {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        dim: usize,
        value: f32,
        left: usize,
        right: usize,
    },
}

/// Nearest neighbour found by [`KdTree::knn`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Index over a borrowed descriptor set.
pub struct KdTree<'a> {
    points: &'a [Descriptor],
    order: Vec<usize>,
    nodes: Vec<Node>,
}

#[derive(PartialEq)]
struct Branch {
    bound: f32,
    node: usize,
}

impl Eq for Branch {}

impl Ord for Branch {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on the lower bound, ties by node id.
        other
            .bound
            .total_cmp(&self.bound)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a> KdTree<'a> {
    /// Builds the tree, splitting on the highest-variance dimension at the median.
    pub fn build(points: &'a [Descriptor]) -> Self {
        let mut tree = Self {
            points,
            order: (0..points.len()).collect(),
            nodes: Vec::new(),
        };
        if !points.is_empty() {
            tree.build_node(0, points.len());
        }
        tree
    }

    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        if end - start <= LEAF_SIZE {
            self.nodes.push(Node::Leaf { start, end });
            return id;
        }

        let dim = self.widest_dim(start, end);
        let points = self.points;
        let mid = start + (end - start) / 2;
        self.order[start..end].select_nth_unstable_by(mid - start, |&a, &b| {
            points[a][dim].total_cmp(&points[b][dim]).then(a.cmp(&b))
        });
        let value = points[self.order[mid]][dim];

        self.nodes.push(Node::Leaf { start, end });
        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        self.nodes[id] = Node::Split {
            dim,
            value,
            left,
            right,
        };
        id
    }

    fn widest_dim(&self, start: usize, end: usize) -> usize {
        let n = (end - start) as f32;
        let mut mean = [0.0f32; DESCRIPTOR_LEN];
        for &i in &self.order[start..end] {
            for (m, v) in mean.iter_mut().zip(self.points[i].iter()) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = [0.0f32; DESCRIPTOR_LEN];
        for &i in &self.order[start..end] {
            for ((acc, v), m) in var.iter_mut().zip(self.points[i].iter()).zip(&mean) {
                *acc += (v - m) * (v - m);
            }
        }
        var.iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then(b.0.cmp(&a.0)))
            .map_or(0, |(dim, _)| dim)
    }

    /// Returns up to `k` approximate nearest neighbours, closest first.
    pub fn knn(&self, query: &Descriptor, k: usize, max_checks: usize) -> Vec<Neighbor> {
        let mut best: Vec<Neighbor> = Vec::with_capacity(k + 1);
        if self.nodes.is_empty() || k == 0 {
            return best;
        }

        let mut heap = BinaryHeap::new();
        heap.push(Branch {
            bound: 0.0,
            node: 0,
        });
        let mut checks = 0usize;

        while let Some(Branch { bound, node }) = heap.pop() {
            if best.len() == k && checks >= max_checks {
                break;
            }
            if best.len() == k && bound >= best[k - 1].distance * best[k - 1].distance {
                continue;
            }

            let mut current = node;
            loop {
                match self.nodes[current] {
                    Node::Split {
                        dim,
                        value,
                        left,
                        right,
                    } => {
                        let diff = query[dim] - value;
                        let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                        heap.push(Branch {
                            bound: bound.max(diff * diff),
                            node: far,
                        });
                        current = near;
                    }
                    Node::Leaf { start, end } => {
                        for &idx in &self.order[start..end] {
                            checks += 1;
                            let distance = euclidean(query, &self.points[idx]);
                            insert_sorted(&mut best, Neighbor { index: idx, distance }, k);
                        }
                        break;
                    }
                }
            }
        }
        best
    }
}

fn insert_sorted(best: &mut Vec<Neighbor>, candidate: Neighbor, k: usize) {
    if best.len() == k && candidate.distance >= best[k - 1].distance {
        return;
    }
    let pos = best.partition_point(|n| {
        n.distance < candidate.distance
            || (n.distance == candidate.distance && n.index < candidate.index)
    });
    best.insert(pos, candidate);
    best.truncate(k);
}

pub(crate) fn euclidean(a: &Descriptor, b: &Descriptor) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::{euclidean, KdTree, DEFAULT_CHECKS};
    use crate::matchers::sift::detect::{Descriptor, DESCRIPTOR_LEN};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(n: usize, seed: u64) -> Vec<Descriptor> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                let mut d = [0.0f32; DESCRIPTOR_LEN];
                d.iter_mut().for_each(|v| *v = rng.random_range(0.0..1.0));
                d
            })
            .collect()
    }

    #[test]
    fn exhaustive_budget_matches_brute_force() {
        let points = random_points(200, 3);
        let queries = random_points(10, 4);
        let tree = KdTree::build(&points);

        for q in &queries {
            let found = tree.knn(q, 2, usize::MAX);
            let mut brute: Vec<(usize, f32)> = points
                .iter()
                .enumerate()
                .map(|(i, p)| (i, euclidean(q, p)))
                .collect();
            brute.sort_by(|a, b| a.1.total_cmp(&b.1));
            assert_eq!(found.len(), 2);
            assert_eq!(found[0].index, brute[0].0);
            assert_eq!(found[1].index, brute[1].0);
        }
    }

    #[test]
    fn exact_duplicate_is_found_within_budget() {
        let points = random_points(300, 5);
        let tree = KdTree::build(&points);
        let hit = tree.knn(&points[123], 2, DEFAULT_CHECKS);
        assert_eq!(hit[0].index, 123);
        assert_eq!(hit[0].distance, 0.0);
        assert!(hit[1].distance > 0.0);
    }

    #[test]
    fn small_sets_return_what_exists() {
        let points = random_points(1, 6);
        let tree = KdTree::build(&points);
        assert_eq!(tree.knn(&points[0], 2, DEFAULT_CHECKS).len(), 1);
        assert!(KdTree::build(&[]).knn(&points[0], 2, DEFAULT_CHECKS).is_empty());
    }
}
