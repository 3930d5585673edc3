//! The sliding-window transaction graph.

use chrono::{DateTime, Utc};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::cycles::simple_cycles;

/// Node budget for the ring-search subgraph. Larger neighborhoods skip
/// cycle enumeration and fall through to the velocity/mule signals.
pub const MAX_RING_SUBGRAPH_NODES: usize = 64;

/// Score assigned when a fraud ring is found.
const RING_SCORE: f64 = 0.9;

/// Lookback for the outgoing-velocity signal, in seconds of wall-clock time.
const VELOCITY_WINDOW_SECS: i64 = 3600;

/// Outgoing transactions within the velocity window before the signal fires.
const VELOCITY_TRIGGER_COUNT: usize = 10;

/// Aggregate statistics carried on a sender -> receiver edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStats {
    /// Number of observed transactions along this edge.
    pub weight: u64,
    /// Sum of their amounts.
    pub total_amount: f64,
}

/// Result of a ring assessment: a score in [0, 1] and, when a ring was
/// found, the accounts participating in it.
#[derive(Debug, Clone, Default)]
pub struct RingAssessment {
    /// Topological risk score.
    pub score: f64,
    /// Members of any detected fraud ring; empty otherwise.
    pub ring: HashSet<String>,
}

impl RingAssessment {
    fn clean() -> Self {
        Self::default()
    }
}

/// Time-windowed directed graph of sender -> receiver transactions.
///
/// Nodes are account ids; each edge aggregates count and total amount.
/// Insertion doubles as window maintenance: every `record` sweeps out nodes
/// whose most recent outgoing transaction has fallen behind the window,
/// using the incoming transaction's timestamp as "now".
#[derive(Debug)]
pub struct TransactionGraph {
    graph: StableDiGraph<String, EdgeStats>,
    nodes: HashMap<String, NodeIndex>,
    outgoing_times: HashMap<String, Vec<DateTime<Utc>>>,
    window: chrono::Duration,
    min_ring_size: usize,
}

impl TransactionGraph {
    /// Create an empty graph with the given window width and minimum cycle
    /// length counted as a ring.
    #[must_use]
    pub fn new(window_hours: i64, min_ring_size: usize) -> Self {
        Self {
            graph: StableDiGraph::new(),
            nodes: HashMap::new(),
            outgoing_times: HashMap::new(),
            window: chrono::Duration::hours(window_hours),
            min_ring_size,
        }
    }

    fn intern(&mut self, account: &str) -> NodeIndex {
        match self.nodes.get(account) {
            Some(&idx) => idx,
            None => {
                let idx = self.graph.add_node(account.to_string());
                self.nodes.insert(account.to_string(), idx);
                idx
            }
        }
    }

    /// Insert a transaction and sweep the window.
    ///
    /// An existing edge accumulates weight and amount; a new pair gets a
    /// fresh edge. The sweep and the insertion are one logical step: callers
    /// holding the graph lock observe either neither or both.
    pub fn record(
        &mut self,
        sender: &str,
        receiver: &str,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) {
        let s = self.intern(sender);
        let r = self.intern(receiver);

        match self.graph.find_edge(s, r) {
            Some(edge) => {
                let stats = &mut self.graph[edge];
                stats.weight += 1;
                stats.total_amount += amount;
            }
            None => {
                self.graph.add_edge(
                    s,
                    r,
                    EdgeStats {
                        weight: 1,
                        total_amount: amount,
                    },
                );
            }
        }

        self.outgoing_times
            .entry(sender.to_string())
            .or_default()
            .push(timestamp);

        self.sweep(timestamp);
    }

    /// Evict every node whose most recent outgoing transaction predates the
    /// window, along with its incident edges and its time list.
    fn sweep(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.window;
        let stale: Vec<String> = self
            .outgoing_times
            .iter()
            .filter(|(_, times)| times.iter().max().is_some_and(|latest| *latest < cutoff))
            .map(|(account, _)| account.clone())
            .collect();

        if stale.is_empty() {
            return;
        }

        for account in &stale {
            if let Some(idx) = self.nodes.remove(account) {
                self.graph.remove_node(idx);
            }
            self.outgoing_times.remove(account);
        }
        tracing::debug!(evicted = stale.len(), "graph window sweep");
    }

    /// Assess the topological fraud risk of a sender/receiver pair.
    ///
    /// When both endpoints are present, cycles are enumerated over the
    /// subgraph spanned by the sender's descendants and the receiver's
    /// ancestors (bounded by [`MAX_RING_SUBGRAPH_NODES`]). Cycles at least
    /// `min_ring_size` long pool their members into a ring scored at 0.9.
    /// With no ring, the score falls back to the larger of the sender's
    /// velocity signal and the receiver's mule signal.
    #[must_use]
    pub fn assess(&self, sender: &str, receiver: &str) -> RingAssessment {
        let (Some(&s), Some(&r)) = (self.nodes.get(sender), self.nodes.get(receiver)) else {
            return RingAssessment::clean();
        };

        match self.ring_neighborhood(s, r) {
            Some(members) => {
                let ring = self.collect_ring(&members);
                if !ring.is_empty() {
                    return RingAssessment {
                        score: RING_SCORE,
                        ring,
                    };
                }
            }
            None => {
                tracing::debug!(
                    sender,
                    receiver,
                    budget = MAX_RING_SUBGRAPH_NODES,
                    "ring search neighborhood over budget, using degree signals"
                );
            }
        }

        let score = self
            .velocity_score(sender)
            .max(self.mule_score(receiver));
        RingAssessment {
            score,
            ring: HashSet::new(),
        }
    }

    /// Nodes reachable forward from the sender plus nodes reaching the
    /// receiver backward, or `None` once the set exceeds the budget.
    fn ring_neighborhood(&self, sender: NodeIndex, receiver: NodeIndex) -> Option<HashSet<NodeIndex>> {
        let mut members: HashSet<NodeIndex> = HashSet::new();
        members.insert(sender);
        members.insert(receiver);

        for (start, direction) in [(sender, Direction::Outgoing), (receiver, Direction::Incoming)]
        {
            let mut seen: HashSet<NodeIndex> = HashSet::new();
            seen.insert(start);
            let mut queue: VecDeque<NodeIndex> = VecDeque::new();
            queue.push_back(start);

            while let Some(node) = queue.pop_front() {
                for next in self.graph.neighbors_directed(node, direction) {
                    if seen.insert(next) {
                        members.insert(next);
                        if members.len() > MAX_RING_SUBGRAPH_NODES {
                            return None;
                        }
                        queue.push_back(next);
                    }
                }
            }
        }

        Some(members)
    }

    /// Pool the members of every qualifying cycle inside the subgraph.
    fn collect_ring(&self, members: &HashSet<NodeIndex>) -> HashSet<String> {
        let order: Vec<NodeIndex> = members.iter().copied().collect();
        let index_of: HashMap<NodeIndex, usize> = order
            .iter()
            .enumerate()
            .map(|(i, &idx)| (idx, i))
            .collect();

        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); order.len()];
        for (i, &node) in order.iter().enumerate() {
            for next in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if let Some(&j) = index_of.get(&next) {
                    adj[i].push(j);
                }
            }
        }

        let mut ring = HashSet::new();
        for cycle in simple_cycles(&adj) {
            if cycle.len() >= self.min_ring_size {
                for i in cycle {
                    ring.insert(self.graph[order[i]].clone());
                }
            }
        }
        ring
    }

    /// Outgoing-burst signal: more than 10 outgoing transactions within the
    /// last wall-clock hour scores `min(count / 20, 1.0)`.
    #[must_use]
    pub fn velocity_score(&self, account: &str) -> f64 {
        let Some(times) = self.outgoing_times.get(account) else {
            return 0.0;
        };

        let cutoff = Utc::now() - chrono::Duration::seconds(VELOCITY_WINDOW_SECS);
        let recent = times.iter().filter(|t| **t > cutoff).count();

        if recent > VELOCITY_TRIGGER_COUNT {
            (recent as f64 / 20.0).min(1.0)
        } else {
            0.0
        }
    }

    /// Pass-through signal: distinct-counterparty in/out degree both above
    /// 5 scores 0.8, both above 3 scores 0.6.
    #[must_use]
    pub fn mule_score(&self, account: &str) -> f64 {
        let Some(&idx) = self.nodes.get(account) else {
            return 0.0;
        };

        let in_degree = self.graph.neighbors_directed(idx, Direction::Incoming).count();
        let out_degree = self.graph.neighbors_directed(idx, Direction::Outgoing).count();

        if in_degree > 5 && out_degree > 5 {
            0.8
        } else if in_degree > 3 && out_degree > 3 {
            0.6
        } else {
            0.0
        }
    }

    /// Whether an account is currently a node in the window.
    #[must_use]
    pub fn contains(&self, account: &str) -> bool {
        self.nodes.contains_key(account)
    }

    /// Number of nodes currently in the window.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Aggregate stats on the sender -> receiver edge, if present.
    #[must_use]
    pub fn edge_stats(&self, sender: &str, receiver: &str) -> Option<EdgeStats> {
        let (s, r) = (self.nodes.get(sender)?, self.nodes.get(receiver)?);
        let edge = self.graph.find_edge(*s, *r)?;
        Some(self.graph[edge])
    }
}
