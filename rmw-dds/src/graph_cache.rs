//! In-memory graph index: nodes and the readers and writers they own.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;
use tracing::debug;

use crate::demangle::DemangleFunction;
use crate::error::{Result, RmwError};
use crate::gid::Gid;
use crate::graph::{GraphIndex, IndexSide};
use crate::names_and_types::NamesAndTypes;

/// (namespace, name)
pub type NodeKey = (String, String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointEntity {
    pub gid: Gid,
    pub side: IndexSide,
    pub topic: String,
    pub type_name: String,
    pub node: NodeKey,
}

#[derive(Default)]
pub struct GraphData {
    endpoints: HashMap<Gid, EndpointEntity>,
    by_node: HashMap<NodeKey, BTreeSet<Gid>>,
}

impl GraphData {
    pub fn visit_by_node<F>(&self, node_key: &NodeKey, mut f: F) -> bool
    where
        F: FnMut(&EndpointEntity),
    {
        let Some(gids) = self.by_node.get(node_key) else {
            debug!("[GRF] No node ({}, {})", node_key.0, node_key.1);
            return false;
        };
        for endpoint in gids.iter().filter_map(|gid| self.endpoints.get(gid)) {
            f(endpoint);
        }
        true
    }

    pub fn visit_all<F>(&self, mut f: F)
    where
        F: FnMut(&EndpointEntity),
    {
        self.endpoints.values().for_each(|e| f(e));
    }
}

/// Accumulates `name -> types`, dropping entries either demangler rejects.
struct Collector {
    demangle_topic: DemangleFunction,
    demangle_type: DemangleFunction,
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl Collector {
    fn new(demangle_topic: DemangleFunction, demangle_type: DemangleFunction) -> Self {
        Self {
            demangle_topic,
            demangle_type,
            entries: BTreeMap::new(),
        }
    }

    fn add(&mut self, endpoint: &EndpointEntity) {
        let Some(name) = (self.demangle_topic)(&endpoint.topic) else {
            return;
        };
        let Some(type_name) = (self.demangle_type)(&endpoint.type_name) else {
            return;
        };
        self.entries.entry(name).or_default().insert(type_name);
    }

    fn finish(self, out: &mut NamesAndTypes) -> Result<()> {
        out.fill_from(self.entries)
    }
}

#[derive(Default)]
pub struct GraphCache {
    data: RwLock<GraphData>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node; adding it again is a no-op.
    pub fn add_node(&self, node_namespace: &str, node_name: &str) {
        let key = (node_namespace.to_owned(), node_name.to_owned());
        debug!("[GRF] Add node ({}, {})", key.0, key.1);
        self.data.write().by_node.entry(key).or_default();
    }

    /// Removes a node together with its endpoints. Returns whether it existed.
    pub fn remove_node(&self, node_namespace: &str, node_name: &str) -> bool {
        let key = (node_namespace.to_owned(), node_name.to_owned());
        let mut data = self.data.write();
        let Some(gids) = data.by_node.remove(&key) else {
            return false;
        };
        for gid in &gids {
            data.endpoints.remove(gid);
        }
        debug!("[GRF] Removed node ({}, {}) with {} endpoints", key.0, key.1, gids.len());
        true
    }

    pub fn add_reader(
        &self,
        gid: Gid,
        topic: &str,
        type_name: &str,
        node_namespace: &str,
        node_name: &str,
    ) -> Result<()> {
        self.add_endpoint(gid, IndexSide::Reader, topic, type_name, node_namespace, node_name)
    }

    pub fn add_writer(
        &self,
        gid: Gid,
        topic: &str,
        type_name: &str,
        node_namespace: &str,
        node_name: &str,
    ) -> Result<()> {
        self.add_endpoint(gid, IndexSide::Writer, topic, type_name, node_namespace, node_name)
    }

    fn add_endpoint(
        &self,
        gid: Gid,
        side: IndexSide,
        topic: &str,
        type_name: &str,
        node_namespace: &str,
        node_name: &str,
    ) -> Result<()> {
        let node = (node_namespace.to_owned(), node_name.to_owned());
        let mut data = self.data.write();
        let Some(gids) = data.by_node.get_mut(&node) else {
            return Err(RmwError::upstream(format!(
                "node ({node_namespace}, {node_name}) is not in the graph"
            )));
        };
        gids.insert(gid);
        debug!("[GRF] Add {side} {gid} on '{topic}' [{type_name}]");
        let endpoint = EndpointEntity {
            gid,
            side,
            topic: topic.to_owned(),
            type_name: type_name.to_owned(),
            node: node.clone(),
        };
        if let Some(previous) = data.endpoints.insert(gid, endpoint)
            && previous.node != node
            && let Some(old) = data.by_node.get_mut(&previous.node)
        {
            old.remove(&gid);
        }
        Ok(())
    }

    /// Removes a reader or writer. Returns whether it existed.
    pub fn remove_entity(&self, gid: &Gid) -> bool {
        let mut data = self.data.write();
        let Some(endpoint) = data.endpoints.remove(gid) else {
            return false;
        };
        if let Some(gids) = data.by_node.get_mut(&endpoint.node) {
            gids.remove(gid);
        }
        debug!("[GRF] Removed {} {gid}", endpoint.side);
        true
    }

    pub fn node_exists(&self, node_namespace: &str, node_name: &str) -> bool {
        self.data
            .read()
            .by_node
            .contains_key(&(node_namespace.to_owned(), node_name.to_owned()))
    }

    pub fn endpoint_count(&self) -> usize {
        self.data.read().endpoints.len()
    }

    fn by_node(
        &self,
        side: IndexSide,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: DemangleFunction,
        demangle_type: DemangleFunction,
        out: &mut NamesAndTypes,
    ) -> Result<()> {
        let key = (node_namespace.to_owned(), node_name.to_owned());
        let mut collector = Collector::new(demangle_topic, demangle_type);
        let found = self.data.read().visit_by_node(&key, |endpoint| {
            if endpoint.side == side {
                collector.add(endpoint);
            }
        });
        if !found {
            return Err(RmwError::upstream(format!(
                "node ({node_namespace}, {node_name}) is not in the graph"
            )));
        }
        collector.finish(out)
    }
}

impl GraphIndex for GraphCache {
    fn reader_names_and_types_by_node(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: DemangleFunction,
        demangle_type: DemangleFunction,
        out: &mut NamesAndTypes,
    ) -> Result<()> {
        self.by_node(IndexSide::Reader, node_name, node_namespace, demangle_topic, demangle_type, out)
    }

    fn writer_names_and_types_by_node(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: DemangleFunction,
        demangle_type: DemangleFunction,
        out: &mut NamesAndTypes,
    ) -> Result<()> {
        self.by_node(IndexSide::Writer, node_name, node_namespace, demangle_topic, demangle_type, out)
    }

    fn names_and_types(
        &self,
        demangle_topic: DemangleFunction,
        demangle_type: DemangleFunction,
        out: &mut NamesAndTypes,
    ) -> Result<()> {
        let mut collector = Collector::new(demangle_topic, demangle_type);
        self.data.read().visit_all(|endpoint| collector.add(endpoint));
        collector.finish(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demangle::{demangle_if_ros_type, demangle_ros_topic_from_topic, identity_demangle};
    use crate::gid::create_rmw_gid;
    use crate::transport::Guid;

    fn gid(n: u8) -> Gid {
        create_rmw_gid("rmw_dds_rs", Guid::new([1; 12], [0, 0, n, 4])).unwrap()
    }

    fn talker_listener() -> GraphCache {
        let graph = GraphCache::new();
        graph.add_node("/", "talker");
        graph.add_node("/", "listener");
        graph
            .add_writer(gid(1), "rt/chatter", "std_msgs::msg::dds_::String_", "/", "talker")
            .unwrap();
        graph
            .add_reader(gid(2), "rt/chatter", "std_msgs::msg::dds_::String_", "/", "listener")
            .unwrap();
        graph
            .add_reader(gid(3), "plain_topic", "PlainType", "/", "listener")
            .unwrap();
        graph
    }

    #[test]
    fn test_by_node_sides() {
        let graph = talker_listener();
        let mut out = NamesAndTypes::zero_initialized();
        graph
            .reader_names_and_types_by_node("listener", "/", demangle_ros_topic_from_topic, demangle_if_ros_type, &mut out)
            .unwrap();
        assert_eq!(out.names, vec!["chatter"]);
        assert_eq!(out.get("chatter").unwrap(), ["std_msgs/msg/String"]);

        let mut out = NamesAndTypes::zero_initialized();
        graph
            .writer_names_and_types_by_node("listener", "/", demangle_ros_topic_from_topic, demangle_if_ros_type, &mut out)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_identity_keeps_everything() {
        let graph = talker_listener();
        let mut out = NamesAndTypes::zero_initialized();
        graph
            .reader_names_and_types_by_node("listener", "/", identity_demangle, identity_demangle, &mut out)
            .unwrap();
        assert_eq!(out.names, vec!["plain_topic", "rt/chatter"]);
    }

    #[test]
    fn test_unknown_node() {
        let graph = talker_listener();
        let mut out = NamesAndTypes::zero_initialized();
        let res = graph.reader_names_and_types_by_node("ghost", "/", identity_demangle, identity_demangle, &mut out);
        assert!(matches!(res, Err(RmwError::UpstreamFailure(_))));
        assert!(graph.add_reader(gid(9), "rt/x", "T", "/", "ghost").is_err());
    }

    #[test]
    fn test_removal() {
        let graph = talker_listener();
        assert_eq!(graph.endpoint_count(), 3);
        assert!(graph.remove_entity(&gid(3)));
        assert!(!graph.remove_entity(&gid(3)));
        assert!(graph.remove_node("/", "talker"));
        assert!(!graph.node_exists("/", "talker"));
        assert_eq!(graph.endpoint_count(), 1);

        let mut out = NamesAndTypes::zero_initialized();
        graph
            .names_and_types(demangle_ros_topic_from_topic, demangle_if_ros_type, &mut out)
            .unwrap();
        assert_eq!(out.names, vec!["chatter"]);
    }

    #[test]
    fn test_types_aggregate_per_name() {
        let graph = talker_listener();
        graph
            .add_writer(gid(4), "rt/chatter", "my_msgs::msg::dds_::Text_", "/", "talker")
            .unwrap();
        let mut out = NamesAndTypes::zero_initialized();
        graph
            .names_and_types(demangle_ros_topic_from_topic, demangle_if_ros_type, &mut out)
            .unwrap();
        assert_eq!(out.get("chatter").unwrap(), ["my_msgs/msg/Text", "std_msgs/msg/String"]);
    }
}
