//! Per-node graph introspection.
//!
//! A query names a [`QueryCategory`]; the category alone decides which half of the
//! graph index is consulted and which pair of demanglers turns raw DDS names and
//! types into ROS ones. The index does the matching and aggregation.

use std::sync::Arc;

use tracing::debug;

use crate::demangle::{
    DemangleFunction, demangle_action_from_feedback_topic, demangle_action_type,
    demangle_if_ros_type, demangle_ros_topic_from_topic, demangle_service_from_topic,
    demangle_service_reply_from_topic, demangle_service_request_from_topic,
    demangle_service_type_only, identity_demangle,
};
use crate::error::{Result, RmwError};
use crate::names_and_types::NamesAndTypes;
use crate::{RMW_DDS_IDENTIFIER, rmw_bail};

/// The shared name/type index, as queried by this crate.
pub trait GraphIndex: Send + Sync {
    /// Names and types of the readers of one node.
    fn reader_names_and_types_by_node(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: DemangleFunction,
        demangle_type: DemangleFunction,
        out: &mut NamesAndTypes,
    ) -> Result<()>;

    /// Names and types of the writers of one node.
    fn writer_names_and_types_by_node(
        &self,
        node_name: &str,
        node_namespace: &str,
        demangle_topic: DemangleFunction,
        demangle_type: DemangleFunction,
        out: &mut NamesAndTypes,
    ) -> Result<()>;

    /// Names and types of every reader and writer in the graph.
    fn names_and_types(
        &self,
        demangle_topic: DemangleFunction,
        demangle_type: DemangleFunction,
        out: &mut NamesAndTypes,
    ) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum IndexSide {
    Reader,
    Writer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum QueryCategory {
    TopicSubscribers,
    TopicPublishers,
    /// Services a node serves: it reads the request topics.
    Services,
    /// Services a node calls: it reads the reply topics.
    Clients,
    /// Actions a node serves: it writes the feedback topics.
    ActionServers,
    /// Actions a node calls: it reads the feedback topics.
    ActionClients,
}

/// Where a category is looked up and how its entries are decoded.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub side: IndexSide,
    pub demangle_name: DemangleFunction,
    pub demangle_type: DemangleFunction,
}

impl QueryCategory {
    pub fn route(self) -> Route {
        match self {
            Self::TopicSubscribers => Route {
                side: IndexSide::Reader,
                demangle_name: demangle_ros_topic_from_topic,
                demangle_type: demangle_if_ros_type,
            },
            Self::TopicPublishers => Route {
                side: IndexSide::Writer,
                demangle_name: demangle_ros_topic_from_topic,
                demangle_type: demangle_if_ros_type,
            },
            Self::Services => Route {
                side: IndexSide::Reader,
                demangle_name: demangle_service_request_from_topic,
                demangle_type: demangle_service_type_only,
            },
            Self::Clients => Route {
                side: IndexSide::Reader,
                demangle_name: demangle_service_reply_from_topic,
                demangle_type: demangle_service_type_only,
            },
            Self::ActionServers => Route {
                side: IndexSide::Writer,
                demangle_name: demangle_action_from_feedback_topic,
                demangle_type: demangle_action_type,
            },
            Self::ActionClients => Route {
                side: IndexSide::Reader,
                demangle_name: demangle_action_from_feedback_topic,
                demangle_type: demangle_action_type,
            },
        }
    }

    /// The route with both demanglers replaced by identity when `no_demangle` is set.
    ///
    /// This applies to service and action categories too, which then report raw
    /// request/reply/feedback topics.
    pub fn route_with(self, no_demangle: bool) -> Route {
        let route = self.route();
        if no_demangle {
            Route {
                demangle_name: identity_demangle,
                demangle_type: identity_demangle,
                ..route
            }
        } else {
            route
        }
    }
}

/// A node as handed to graph queries.
#[derive(Clone)]
pub struct NodeHandle {
    pub implementation_identifier: &'static str,
    pub name: String,
    pub namespace: String,
    pub graph: Arc<dyn GraphIndex>,
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("implementation_identifier", &self.implementation_identifier)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .finish()
    }
}

fn validate_node(node: &NodeHandle) -> Result<()> {
    if node.implementation_identifier != RMW_DDS_IDENTIFIER {
        rmw_bail!(RmwError::invalid_argument(format!(
            "node handle not from this implementation: '{}'",
            node.implementation_identifier
        )));
    }
    Ok(())
}

fn validate_output(out: &NamesAndTypes) -> Result<()> {
    if let Err(e) = out.check_zero() {
        rmw_bail!(e);
    }
    Ok(())
}

/// Names and types of one category, for the node `node_namespace`/`node_name`.
///
/// `node` is the querying node; the queried node may be any node of the graph.
pub fn query_names_and_types_by_node(
    node: &NodeHandle,
    node_name: &str,
    node_namespace: &str,
    category: QueryCategory,
    no_demangle: bool,
    out: &mut NamesAndTypes,
) -> Result<()> {
    validate_node(node)?;
    if node_name.is_empty() {
        rmw_bail!(RmwError::invalid_argument("node name is empty"));
    }
    if node_namespace.is_empty() {
        rmw_bail!(RmwError::invalid_argument("node namespace is empty"));
    }
    validate_output(out)?;

    let route = category.route_with(no_demangle);
    debug!(
        "[GRF] {category} of ({node_namespace}, {node_name}) from {} side, no_demangle={no_demangle}",
        route.side
    );
    let res = match route.side {
        IndexSide::Reader => node.graph.reader_names_and_types_by_node(
            node_name,
            node_namespace,
            route.demangle_name,
            route.demangle_type,
            out,
        ),
        IndexSide::Writer => node.graph.writer_names_and_types_by_node(
            node_name,
            node_namespace,
            route.demangle_name,
            route.demangle_type,
            out,
        ),
    };
    res.map_err(RmwError::record)
}

pub fn get_subscriber_names_and_types_by_node(
    node: &NodeHandle,
    node_name: &str,
    node_namespace: &str,
    no_demangle: bool,
    out: &mut NamesAndTypes,
) -> Result<()> {
    query_names_and_types_by_node(
        node,
        node_name,
        node_namespace,
        QueryCategory::TopicSubscribers,
        no_demangle,
        out,
    )
}

pub fn get_publisher_names_and_types_by_node(
    node: &NodeHandle,
    node_name: &str,
    node_namespace: &str,
    no_demangle: bool,
    out: &mut NamesAndTypes,
) -> Result<()> {
    query_names_and_types_by_node(
        node,
        node_name,
        node_namespace,
        QueryCategory::TopicPublishers,
        no_demangle,
        out,
    )
}

pub fn get_service_names_and_types_by_node(
    node: &NodeHandle,
    node_name: &str,
    node_namespace: &str,
    out: &mut NamesAndTypes,
) -> Result<()> {
    query_names_and_types_by_node(node, node_name, node_namespace, QueryCategory::Services, false, out)
}

pub fn get_client_names_and_types_by_node(
    node: &NodeHandle,
    node_name: &str,
    node_namespace: &str,
    out: &mut NamesAndTypes,
) -> Result<()> {
    query_names_and_types_by_node(node, node_name, node_namespace, QueryCategory::Clients, false, out)
}

pub fn get_action_server_names_and_types_by_node(
    node: &NodeHandle,
    node_name: &str,
    node_namespace: &str,
    out: &mut NamesAndTypes,
) -> Result<()> {
    query_names_and_types_by_node(
        node,
        node_name,
        node_namespace,
        QueryCategory::ActionServers,
        false,
        out,
    )
}

pub fn get_action_client_names_and_types_by_node(
    node: &NodeHandle,
    node_name: &str,
    node_namespace: &str,
    out: &mut NamesAndTypes,
) -> Result<()> {
    query_names_and_types_by_node(
        node,
        node_name,
        node_namespace,
        QueryCategory::ActionClients,
        false,
        out,
    )
}

/// Every topic in the graph, readers and writers alike.
pub fn get_topic_names_and_types(
    node: &NodeHandle,
    no_demangle: bool,
    out: &mut NamesAndTypes,
) -> Result<()> {
    validate_node(node)?;
    validate_output(out)?;
    let route = QueryCategory::TopicSubscribers.route_with(no_demangle);
    node.graph
        .names_and_types(route.demangle_name, route.demangle_type, out)
        .map_err(RmwError::record)
}

/// Every service in the graph, whether seen from its request or its reply topic.
pub fn get_service_names_and_types(node: &NodeHandle, out: &mut NamesAndTypes) -> Result<()> {
    validate_node(node)?;
    validate_output(out)?;
    node.graph
        .names_and_types(demangle_service_from_topic, demangle_service_type_only, out)
        .map_err(RmwError::record)
}
