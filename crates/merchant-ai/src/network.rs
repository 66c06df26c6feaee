//! Relationship Network
//!
//! Undirected, trust-weighted graph between agents. Each pair has at most one
//! canonical edge keyed by the sorted id pair. Price information spreads along
//! edges with a delay and a reliability set by the relationship type.

use market_events::clamp_unit;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

use crate::agent::{TradeRecord, TRADE_HISTORY_LIMIT};

/// Strength and trust of a freshly created relationship
pub const INITIAL_BOND: f64 = 0.5;

/// Friendly edges stronger than this join clusters
pub const CLUSTER_STRENGTH: f64 = 0.7;

/// Packets kept per inbox; the oldest are dropped first
pub const INBOX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("agent '{0}' is not registered")]
    UnknownAgent(String),
    #[error("agent '{0}' cannot relate to itself")]
    SelfRelationship(String),
    #[error("no relationship between '{0}' and '{1}'")]
    NoRelationship(String, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    #[default]
    Neutral,
    Friendly,
    Rival,
    Allied,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Neutral => "neutral",
            RelationshipType::Friendly => "friendly",
            RelationshipType::Rival => "rival",
            RelationshipType::Allied => "allied",
        }
    }

    /// (delay in ticks, reliability) for information crossing an edge of
    /// this type.
    pub fn channel(&self, strength: f64, trust: f64) -> (u32, f64) {
        match self {
            RelationshipType::Allied => (1, 0.95 * trust),
            RelationshipType::Friendly => {
                let speedup = (2.0 * strength.clamp(0.0, 1.0)) as u32;
                (3u32.saturating_sub(speedup).max(1), 0.7 + 0.2 * trust)
            }
            RelationshipType::Rival => (6, 0.3 * trust),
            RelationshipType::Neutral => (3, 0.7 * trust),
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical edge between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Sorted id pair
    pub agents: (String, String),
    pub relationship_type: RelationshipType,
    pub strength: f64,
    pub trust: f64,
    pub trade_history: Vec<TradeRecord>,
}

impl Relationship {
    fn new(key: (String, String), relationship_type: RelationshipType) -> Self {
        Self {
            agents: key,
            relationship_type,
            strength: INITIAL_BOND,
            trust: INITIAL_BOND,
            trade_history: Vec::new(),
        }
    }

    pub fn involves(&self, agent_id: &str) -> bool {
        self.agents.0 == agent_id || self.agents.1 == agent_id
    }

    /// The other end of the edge, if `agent_id` is one end.
    pub fn other(&self, agent_id: &str) -> Option<&str> {
        if self.agents.0 == agent_id {
            Some(self.agents.1.as_str())
        } else if self.agents.1 == agent_id {
            Some(self.agents.0.as_str())
        } else {
            None
        }
    }

    fn joins_cluster(&self) -> bool {
        match self.relationship_type {
            RelationshipType::Allied => true,
            RelationshipType::Friendly => self.strength > CLUSTER_STRENGTH,
            _ => false,
        }
    }
}

/// Price information about one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformationPacket {
    pub item_id: String,
    pub price_change: f64,
    pub source: String,
    pub reliability: f64,
    pub timestamp: u64,
}

impl InformationPacket {
    pub fn new(
        item_id: impl Into<String>,
        price_change: f64,
        source: impl Into<String>,
        reliability: f64,
        timestamp: u64,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            price_change,
            source: source.into(),
            reliability: clamp_unit(reliability),
            timestamp,
        }
    }
}

/// Delivery instruction for one neighbour of the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationEvent {
    pub target_id: String,
    pub packet: InformationPacket,
    pub delay: u32,
    pub reliability: f64,
}

fn edge_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[derive(Debug, Default)]
struct NetworkState {
    agents: BTreeSet<String>,
    edges: BTreeMap<(String, String), Relationship>,
    inboxes: HashMap<String, Vec<InformationPacket>>,
}

impl NetworkState {
    fn require_pair(&self, a: &str, b: &str) -> Result<(String, String), NetworkError> {
        if a == b {
            return Err(NetworkError::SelfRelationship(a.to_string()));
        }
        for id in [a, b] {
            if !self.agents.contains(id) {
                return Err(NetworkError::UnknownAgent(id.to_string()));
            }
        }
        Ok(edge_key(a, b))
    }

    fn edge_mut(&mut self, a: &str, b: &str) -> Result<&mut Relationship, NetworkError> {
        let key = self.require_pair(a, b)?;
        self.edges
            .get_mut(&key)
            .ok_or_else(|| NetworkError::NoRelationship(key.0.clone(), key.1.clone()))
    }
}

/// Agent relationship graph.
#[derive(Debug, Default)]
pub struct RelationshipNetwork {
    state: RwLock<NetworkState>,
}

impl RelationshipNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an agent. Returns false if it was already present.
    pub fn add_agent(&self, agent_id: &str) -> bool {
        self.state.write().agents.insert(agent_id.to_string())
    }

    /// Removes an agent, every relationship touching it and its inbox.
    pub fn remove_agent(&self, agent_id: &str) -> bool {
        let mut state = self.state.write();
        if !state.agents.remove(agent_id) {
            return false;
        }
        let before = state.edges.len();
        state.edges.retain(|_, rel| !rel.involves(agent_id));
        state.inboxes.remove(agent_id);
        debug!(
            agent = agent_id,
            dropped = before - state.edges.len(),
            "agent removed from network"
        );
        true
    }

    pub fn contains_agent(&self, agent_id: &str) -> bool {
        self.state.read().agents.contains(agent_id)
    }

    pub fn agent_count(&self) -> usize {
        self.state.read().agents.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.state.read().edges.len()
    }

    /// Creates or overwrites the relationship between `a` and `b` with
    /// strength and trust reset to 0.5. Nothing changes on error.
    pub fn add_relationship(
        &self,
        a: &str,
        b: &str,
        relationship_type: RelationshipType,
    ) -> Result<(), NetworkError> {
        let mut state = self.state.write();
        let key = state.require_pair(a, b)?;
        debug!(a = key.0.as_str(), b = key.1.as_str(), kind = %relationship_type, "relationship set");
        state
            .edges
            .insert(key.clone(), Relationship::new(key, relationship_type));
        Ok(())
    }

    /// Copy of the edge between `a` and `b`, in either order.
    pub fn relationship(&self, a: &str, b: &str) -> Option<Relationship> {
        self.state.read().edges.get(&edge_key(a, b)).cloned()
    }

    /// Copies of every edge touching `agent_id`, ordered by key.
    pub fn relationships_of(&self, agent_id: &str) -> Vec<Relationship> {
        self.state
            .read()
            .edges
            .values()
            .filter(|rel| rel.involves(agent_id))
            .cloned()
            .collect()
    }

    /// Shifts strength by `delta` and trust by half a positive delta or 30%
    /// of a negative one, both clamped to [0, 1].
    pub fn update_strength(&self, a: &str, b: &str, delta: f64) -> Result<(), NetworkError> {
        let mut state = self.state.write();
        let rel = state.edge_mut(a, b)?;

        rel.strength = (rel.strength + delta).clamp(0.0, 1.0);
        let trust_delta = if delta > 0.0 { delta * 0.5 } else { delta * 0.3 };
        rel.trust = (rel.trust + trust_delta).clamp(0.0, 1.0);

        trace!(a = a, b = b, strength = rel.strength, trust = rel.trust, "relationship updated");
        Ok(())
    }

    /// Appends a settled trade to the edge's history.
    pub fn record_trade(&self, a: &str, b: &str, record: TradeRecord) -> Result<(), NetworkError> {
        let mut state = self.state.write();
        let rel = state.edge_mut(a, b)?;
        rel.trade_history.push(record);
        if rel.trade_history.len() > TRADE_HISTORY_LIMIT {
            let excess = rel.trade_history.len() - TRADE_HISTORY_LIMIT;
            rel.trade_history.drain(..excess);
        }
        Ok(())
    }

    /// Sends `info` to every neighbour of its source.
    ///
    /// Each neighbour's inbox receives the raw packet; the returned events
    /// (ordered by target id) carry the delay and the compounded reliability.
    /// An unregistered source reaches nobody.
    pub fn propagate(&self, info: &InformationPacket) -> Vec<PropagationEvent> {
        let mut state = self.state.write();
        if !state.agents.contains(&info.source) {
            return Vec::new();
        }

        let mut events: Vec<PropagationEvent> = state
            .edges
            .values()
            .filter_map(|rel| {
                let target = rel.other(&info.source)?;
                let (delay, reliability) = rel.relationship_type.channel(rel.strength, rel.trust);
                Some(PropagationEvent {
                    target_id: target.to_string(),
                    packet: info.clone(),
                    delay,
                    reliability: clamp_unit(reliability * info.reliability),
                })
            })
            .collect();
        events.sort_by(|a, b| a.target_id.cmp(&b.target_id));

        for event in &events {
            let inbox = state.inboxes.entry(event.target_id.clone()).or_default();
            inbox.push(info.clone());
            if inbox.len() > INBOX_LIMIT {
                let excess = inbox.len() - INBOX_LIMIT;
                inbox.drain(..excess);
            }
        }

        debug!(
            source = info.source.as_str(),
            item = info.item_id.as_str(),
            targets = events.len(),
            "information propagated"
        );
        events
    }

    /// Copy of the packets delivered to `agent_id`, oldest first.
    pub fn information_for(&self, agent_id: &str) -> Vec<InformationPacket> {
        self.state
            .read()
            .inboxes
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Empties and returns the agent's inbox.
    pub fn take_information(&self, agent_id: &str) -> Vec<InformationPacket> {
        self.state
            .write()
            .inboxes
            .remove(agent_id)
            .unwrap_or_default()
    }

    /// Connected groups over allied edges and strong friendly edges.
    ///
    /// Only groups of two or more are returned. Members are sorted and groups
    /// are ordered by their first member.
    pub fn clusters(&self) -> Vec<Vec<String>> {
        let state = self.state.read();

        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for rel in state.edges.values().filter(|rel| rel.joins_cluster()) {
            let (a, b) = (rel.agents.0.as_str(), rel.agents.1.as_str());
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut clusters = Vec::new();

        for agent in state.agents.iter().map(String::as_str) {
            if visited.contains(agent) {
                continue;
            }
            visited.insert(agent);

            let mut members = vec![agent.to_string()];
            let mut stack = vec![agent];
            while let Some(current) = stack.pop() {
                for &next in adjacency.get(current).into_iter().flatten() {
                    if visited.insert(next) {
                        members.push(next.to_string());
                        stack.push(next);
                    }
                }
            }

            if members.len() > 1 {
                members.sort();
                clusters.push(members);
            }
        }

        debug!(count = clusters.len(), "clusters found");
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(ids: &[&str]) -> RelationshipNetwork {
        let network = RelationshipNetwork::new();
        for id in ids {
            network.add_agent(id);
        }
        network
    }

    fn packet(source: &str, reliability: f64) -> InformationPacket {
        InformationPacket::new("sword", 12.5, source, reliability, 7)
    }

    #[test]
    fn test_add_relationship_is_symmetric() {
        let net = network(&["b", "a"]);
        net.add_relationship("b", "a", RelationshipType::Friendly).unwrap();

        let forward = net.relationship("a", "b").unwrap();
        let backward = net.relationship("b", "a").unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.agents, ("a".to_string(), "b".to_string()));
        assert_eq!(forward.strength, 0.5);
        assert_eq!(forward.trust, 0.5);
        assert_eq!(net.relationship_count(), 1);
    }

    #[test]
    fn test_overwrite_resets_bond() {
        let net = network(&["a", "b"]);
        net.add_relationship("a", "b", RelationshipType::Friendly).unwrap();
        net.update_strength("a", "b", 0.4).unwrap();
        net.add_relationship("b", "a", RelationshipType::Rival).unwrap();

        let rel = net.relationship("a", "b").unwrap();
        assert_eq!(rel.relationship_type, RelationshipType::Rival);
        assert_eq!(rel.strength, 0.5);
        assert_eq!(net.relationship_count(), 1);
    }

    #[test]
    fn test_errors_leave_graph_untouched() {
        let net = network(&["a", "b"]);
        assert_eq!(
            net.add_relationship("a", "ghost", RelationshipType::Allied),
            Err(NetworkError::UnknownAgent("ghost".into()))
        );
        assert_eq!(
            net.add_relationship("a", "a", RelationshipType::Allied),
            Err(NetworkError::SelfRelationship("a".into()))
        );
        assert_eq!(
            net.update_strength("a", "b", 0.1),
            Err(NetworkError::NoRelationship("a".into(), "b".into()))
        );
        assert!(matches!(
            net.update_strength("ghost", "b", 0.1),
            Err(NetworkError::UnknownAgent(_))
        ));
        assert_eq!(net.relationship_count(), 0);
    }

    #[test]
    fn test_update_strength() {
        let net = network(&["a", "b"]);
        net.add_relationship("a", "b", RelationshipType::Neutral).unwrap();
        net.update_strength("a", "b", 0.3).unwrap();
        let rel = net.relationship("a", "b").unwrap();
        assert!((rel.strength - 0.8).abs() < 1e-12);
        assert!((rel.trust - 0.65).abs() < 1e-12);

        net.update_strength("b", "a", -0.5).unwrap();
        let rel = net.relationship("a", "b").unwrap();
        assert!((rel.strength - 0.3).abs() < 1e-12);
        assert!((rel.trust - 0.5).abs() < 1e-12);

        net.update_strength("a", "b", 5.0).unwrap();
        net.update_strength("a", "b", 5.0).unwrap();
        let rel = net.relationship("a", "b").unwrap();
        assert_eq!(rel.strength, 1.0);
        assert_eq!(rel.trust, 1.0);

        net.update_strength("a", "b", -50.0).unwrap();
        let rel = net.relationship("a", "b").unwrap();
        assert_eq!(rel.strength, 0.0);
        assert_eq!(rel.trust, 0.0);
    }

    #[test]
    fn test_channels() {
        assert_eq!(RelationshipType::Allied.channel(0.5, 0.5), (1, 0.475));
        assert_eq!(RelationshipType::Rival.channel(0.5, 0.5), (6, 0.15));
        assert_eq!(RelationshipType::Neutral.channel(0.5, 0.5), (3, 0.35));

        let (delay, reliability) = RelationshipType::Friendly.channel(0.5, 0.5);
        assert_eq!(delay, 2);
        assert!((reliability - 0.8).abs() < 1e-12);
        assert_eq!(RelationshipType::Friendly.channel(0.0, 0.5).0, 3);
        assert_eq!(RelationshipType::Friendly.channel(1.0, 0.5).0, 1);
        assert_eq!(RelationshipType::Friendly.channel(0.99, 0.5).0, 2);
    }

    #[test]
    fn test_allied_beats_rival() {
        for trust in [0.1, 0.5, 1.0] {
            let allied = RelationshipType::Allied.channel(0.5, trust);
            let rival = RelationshipType::Rival.channel(0.5, trust);
            assert!(allied.0 <= rival.0);
            assert!(allied.1 > rival.1);
        }
    }

    #[test]
    fn test_propagate() {
        let net = network(&["src", "ally", "rival", "loner"]);
        net.add_relationship("src", "rival", RelationshipType::Rival).unwrap();
        net.add_relationship("ally", "src", RelationshipType::Allied).unwrap();

        let events = net.propagate(&packet("src", 0.8));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].target_id, "ally");
        assert_eq!(events[0].delay, 1);
        assert!((events[0].reliability - 0.95 * 0.5 * 0.8).abs() < 1e-12);
        assert_eq!(events[1].target_id, "rival");
        assert_eq!(events[1].delay, 6);
        assert!((events[1].reliability - 0.3 * 0.5 * 0.8).abs() < 1e-12);

        // inboxes hold the raw packet
        let inbox = net.information_for("ally");
        assert_eq!(inbox, vec![packet("src", 0.8)]);
        assert!(net.information_for("loner").is_empty());
        assert!(net.information_for("src").is_empty());

        assert_eq!(net.take_information("ally").len(), 1);
        assert!(net.information_for("ally").is_empty());
    }

    #[test]
    fn test_propagate_from_unknown_source() {
        let net = network(&["a"]);
        assert!(net.propagate(&packet("ghost", 1.0)).is_empty());
    }

    #[test]
    fn test_remove_agent_cascades() {
        let net = network(&["a", "b", "c"]);
        net.add_relationship("a", "b", RelationshipType::Allied).unwrap();
        net.add_relationship("b", "c", RelationshipType::Allied).unwrap();
        net.add_relationship("a", "c", RelationshipType::Rival).unwrap();
        net.propagate(&packet("a", 1.0));

        assert!(net.remove_agent("b"));
        assert!(!net.remove_agent("b"));
        assert_eq!(net.relationship_count(), 1);
        assert!(net.relationships_of("b").is_empty());
        assert!(net.information_for("b").is_empty());
        assert_eq!(net.relationships_of("a").len(), 1);
    }

    #[test]
    fn test_inbox_is_bounded() {
        let net = network(&["src", "dst"]);
        net.add_relationship("src", "dst", RelationshipType::Friendly).unwrap();
        for tick in 0..(INBOX_LIMIT as u64 + 25) {
            net.propagate(&InformationPacket::new("sword", 1.0, "src", 0.5, tick));
        }

        let inbox = net.information_for("dst");
        assert_eq!(inbox.len(), INBOX_LIMIT);
        assert_eq!(inbox[0].timestamp, 25);
        assert_eq!(inbox[INBOX_LIMIT - 1].timestamp, INBOX_LIMIT as u64 + 24);
    }

    #[test]
    fn test_record_trade() {
        let net = network(&["a", "b"]);
        net.add_relationship("a", "b", RelationshipType::Friendly).unwrap();
        let record = TradeRecord {
            item_id: "silk".into(),
            quantity: 2,
            buy_price: 10.0,
            sell_price: 14.0,
            profit: 8.0,
            timestamp: 3,
        };
        net.record_trade("b", "a", record.clone()).unwrap();
        assert_eq!(net.relationship("a", "b").unwrap().trade_history, vec![record.clone()]);
        assert!(net.record_trade("a", "zz", record).is_err());
    }

    #[test]
    fn test_clusters() {
        let net = network(&["a", "b", "c", "d", "e", "f"]);
        net.add_relationship("a", "b", RelationshipType::Allied).unwrap();
        net.add_relationship("c", "b", RelationshipType::Friendly).unwrap();
        net.update_strength("b", "c", 0.3).unwrap();
        net.add_relationship("d", "e", RelationshipType::Friendly).unwrap();
        net.add_relationship("e", "f", RelationshipType::Rival).unwrap();

        // friendly at exactly 0.5 does not join
        assert_eq!(net.clusters(), vec![vec!["a".to_string(), "b".into(), "c".into()]]);

        net.add_relationship("f", "d", RelationshipType::Allied).unwrap();
        let clusters = net.clusters();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1], vec!["d".to_string(), "f".into()]);
    }

    #[test]
    fn test_clusters_invariant_under_relabeling() {
        let shape = |ids: [&str; 4]| {
            let net = network(&ids);
            net.add_relationship(ids[0], ids[1], RelationshipType::Allied).unwrap();
            net.add_relationship(ids[2], ids[3], RelationshipType::Allied).unwrap();
            let mut sizes: Vec<usize> = net.clusters().iter().map(Vec::len).collect();
            sizes.sort();
            (sizes, net.clusters().into_iter().flatten().collect::<BTreeSet<_>>().len())
        };
        assert_eq!(shape(["a", "b", "c", "d"]), shape(["z", "y", "x", "w"]));
        assert_eq!(shape(["a", "b", "c", "d"]), (vec![2, 2], 4));
    }

    #[test]
    fn test_concurrent_propagation() {
        let net = network(&["hub", "s1", "s2", "s3"]);
        for spoke in ["s1", "s2", "s3"] {
            net.add_relationship("hub", spoke, RelationshipType::Friendly).unwrap();
        }
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let net = &net;
                scope.spawn(move || {
                    for _ in 0..25 {
                        net.propagate(&packet("hub", 1.0));
                    }
                });
            }
        });
        assert_eq!(net.information_for("s2").len(), 100);
    }
}
