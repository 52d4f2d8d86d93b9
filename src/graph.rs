//! Internal link graph: arena node table plus adjacency lists.
//!
//! Nodes are keyed by normalized URL and stored in insertion order; edges are
//! index pairs, deduplicated per source page. Cycles are expected (mutual
//! linking is normal), so depth comes from first-visit BFS over the seed set
//! and no metric requires acyclicity.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

/// Incrementally built link graph. Mutation ends at [`GraphBuilder::finalize`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    index: HashMap<String, usize>,
    urls: Vec<String>,
    /// Outgoing edges per node, deduplicated.
    adjacency: Vec<Vec<usize>>,
    edge_count: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the node for `url` if absent and returns its index.
    ///
    /// Feeding an unnormalized URL here is a core-logic bug: identity
    /// comparisons would silently split one page into two nodes.
    pub fn intern(&mut self, url: &str) -> usize {
        debug_assert!(
            crate::urlnorm::normalize_absolute(url).is_some_and(|u| u.as_str() == url),
            "graph received unnormalized URL: {url}"
        );
        if let Some(&index) = self.index.get(url) {
            return index;
        }
        let index = self.urls.len();
        self.urls.push(url.to_string());
        self.index.insert(url.to_string(), index);
        self.adjacency.push(Vec::new());
        index
    }

    /// Registers `alias` as a second key for the node of `url`.
    ///
    /// Used for redirect destinations: links pointing at the destination
    /// resolve to the node of the URL that was actually fetched, so one
    /// document never splits into two nodes. A no-op when the alias is
    /// already a node of its own.
    pub fn alias(&mut self, url: &str, alias: &str) {
        debug_assert!(
            crate::urlnorm::normalize_absolute(alias).is_some_and(|u| u.as_str() == alias),
            "graph received unnormalized alias: {alias}"
        );
        let index = self.intern(url);
        self.index.entry(alias.to_string()).or_insert(index);
    }

    /// Records one fetched page and its internal link targets.
    ///
    /// Called at most once per unique normalized URL; edges out of `url` are
    /// deduplicated here so a nav menu repeated in the footer counts once.
    pub fn add_page(&mut self, url: &str, internal_targets: &[String]) {
        let source = self.intern(url);
        let mut seen: HashSet<usize> = self.adjacency[source].iter().copied().collect();
        for target_url in internal_targets {
            let target = self.intern(target_url);
            if target != source && seen.insert(target) {
                self.adjacency[source].push(target);
                self.edge_count += 1;
            }
        }
    }

    /// Freezes the graph and computes structural metrics.
    ///
    /// Depth is BFS distance from the seed set (seeds at 0); unreachable
    /// nodes have no depth. Orphans are nodes with zero in-degree that are
    /// not seeds. Authority is in-degree normalized by the maximum in-degree.
    pub fn finalize(self, seeds: &[String]) -> LinkGraph {
        let node_count = self.urls.len();
        let mut in_degree = vec![0usize; node_count];
        for targets in &self.adjacency {
            for &target in targets {
                in_degree[target] += 1;
            }
        }

        // BFS from all seeds at once; first visit wins, which is shortest
        // path in an unweighted graph.
        let mut depth: Vec<Option<u32>> = vec![None; node_count];
        let mut queue = VecDeque::new();
        let mut seed_indices = HashSet::new();
        for seed in seeds {
            if let Some(&index) = self.index.get(seed) {
                seed_indices.insert(index);
                if depth[index].is_none() {
                    depth[index] = Some(0);
                    queue.push_back(index);
                }
            }
        }
        while let Some(node) = queue.pop_front() {
            let next_depth = depth[node].expect("queued nodes have depth") + 1;
            for &target in &self.adjacency[node] {
                if depth[target].is_none() {
                    depth[target] = Some(next_depth);
                    queue.push_back(target);
                }
            }
        }

        let max_in_degree = in_degree.iter().copied().max().unwrap_or(0);

        let nodes: Vec<NodeMetrics> = self
            .urls
            .iter()
            .enumerate()
            .map(|(index, url)| NodeMetrics {
                url: url.clone(),
                in_degree: in_degree[index],
                out_degree: self.adjacency[index].len(),
                depth: depth[index],
                orphan: in_degree[index] == 0 && !seed_indices.contains(&index),
                authority: if max_in_degree == 0 {
                    0.0
                } else {
                    in_degree[index] as f64 / max_in_degree as f64
                },
            })
            .collect();

        LinkGraph {
            index: self.index,
            nodes,
            edge_count: self.edge_count,
        }
    }
}

/// Structural metrics for one node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeMetrics {
    pub url: String,
    pub in_degree: usize,
    pub out_degree: usize,
    /// BFS distance from the seed set; `None` if unreachable.
    pub depth: Option<u32>,
    /// Zero in-degree and not a seed.
    pub orphan: bool,
    /// In-degree normalized by the maximum in-degree (0.0 when no edges).
    pub authority: f64,
}

/// Finalized, read-only link graph.
#[derive(Debug, Clone, Serialize)]
pub struct LinkGraph {
    #[serde(skip)]
    index: HashMap<String, usize>,
    pub nodes: Vec<NodeMetrics>,
    pub edge_count: usize,
}

impl LinkGraph {
    pub fn node(&self, url: &str) -> Option<&NodeMetrics> {
        self.index.get(url).map(|&index| &self.nodes[index])
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes with zero in-degree, seeds excluded, in insertion order.
    pub fn orphans(&self) -> impl Iterator<Item = &NodeMetrics> {
        self.nodes.iter().filter(|n| n.orphan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(path: &str) -> String {
        format!("https://example.com{path}")
    }

    #[test]
    fn test_edges_dedup_per_source() {
        let mut builder = GraphBuilder::new();
        builder.add_page(&u("/"), &[u("/a"), u("/a"), u("/b")]);
        let graph = builder.finalize(&[u("/")]);
        assert_eq!(graph.edge_count, 2);
        assert_eq!(graph.node(&u("/")).unwrap().out_degree, 2);
        assert_eq!(graph.node(&u("/a")).unwrap().in_degree, 1);
    }

    #[test]
    fn test_self_links_ignored() {
        let mut builder = GraphBuilder::new();
        builder.add_page(&u("/"), &[u("/")]);
        let graph = builder.finalize(&[u("/")]);
        assert_eq!(graph.edge_count, 0);
    }

    #[test]
    fn test_bfs_depth_with_cycle() {
        let mut builder = GraphBuilder::new();
        // / -> /a -> /b -> /a (cycle), / -> /c
        builder.add_page(&u("/"), &[u("/a"), u("/c")]);
        builder.add_page(&u("/a"), &[u("/b")]);
        builder.add_page(&u("/b"), &[u("/a")]);
        let graph = builder.finalize(&[u("/")]);

        assert_eq!(graph.node(&u("/")).unwrap().depth, Some(0));
        assert_eq!(graph.node(&u("/a")).unwrap().depth, Some(1));
        assert_eq!(graph.node(&u("/c")).unwrap().depth, Some(1));
        assert_eq!(graph.node(&u("/b")).unwrap().depth, Some(2));
    }

    #[test]
    fn test_orphans_exclude_seeds() {
        let mut builder = GraphBuilder::new();
        builder.add_page(&u("/"), &[u("/linked")]);
        // Sitemap seed that nothing links to.
        builder.intern(&u("/lonely"));
        let graph = builder.finalize(&[u("/")]);

        let orphans: Vec<&str> = graph.orphans().map(|n| n.url.as_str()).collect();
        assert_eq!(orphans, vec![u("/lonely")]);
        assert!(!graph.node(&u("/")).unwrap().orphan, "seed is not an orphan");
        assert!(graph.node(&u("/lonely")).unwrap().depth.is_none());
    }

    #[test]
    fn test_authority_normalized_by_max_in_degree() {
        let mut builder = GraphBuilder::new();
        builder.add_page(&u("/"), &[u("/popular"), u("/niche")]);
        builder.add_page(&u("/a"), &[u("/popular")]);
        builder.add_page(&u("/b"), &[u("/popular")]);
        let graph = builder.finalize(&[u("/")]);

        let popular = graph.node(&u("/popular")).unwrap();
        let niche = graph.node(&u("/niche")).unwrap();
        assert_eq!(popular.in_degree, 3);
        assert!((popular.authority - 1.0).abs() < f64::EPSILON);
        assert!((niche.authority - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_alias_merges_redirect_destination() {
        let mut builder = GraphBuilder::new();
        // /old was fetched and redirected to /new.
        builder.alias(&u("/old"), &u("/new"));
        builder.add_page(&u("/"), &[u("/old")]);
        builder.add_page(&u("/a"), &[u("/new")]);
        let graph = builder.finalize(&[u("/")]);

        // Both link targets land on the same node.
        let old = graph.node(&u("/old")).unwrap();
        let via_alias = graph.node(&u("/new")).unwrap();
        assert_eq!(old.url, u("/old"));
        assert_eq!(via_alias.url, u("/old"));
        assert_eq!(old.in_degree, 2);
        // Three real nodes, not four.
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_empty_graph() {
        let graph = GraphBuilder::new().finalize(&[]);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count, 0);
    }
}
