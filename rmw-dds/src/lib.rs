//! # rmw-dds: ROS middleware entities on top of a DDS transport
//!
//! `rmw-dds` creates ROS subscriptions on a DDS participant and answers graph
//! introspection queries ("which topics does this node subscribe to?") by
//! demangling DDS topic and type names back into ROS ones.
//!
//! ## Getting started
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rmw_dds::prelude::*;
//! use rmw_dds::testing::{MemParticipant, StaticTypeSupport};
//!
//! let ctx = ContextBuilder::default().build()?;
//! let participant = ctx.create_participant_info(Arc::new(MemParticipant::new()));
//! let type_supports = [MessageTypeSupportHandle {
//!     typesupport_identifier: TYPESUPPORT_CPP,
//!     data: Arc::new(StaticTypeSupport::new("std_msgs::msg", "String")),
//! }];
//!
//! let sub = participant.create_subscription(&type_supports, "chatter").build()?;
//! assert_eq!(sub.data().dds_topic_name(), "rt/chatter");
//! destroy_subscription(sub)?;
//! # Ok::<(), rmw_dds::error::RmwError>(())
//! ```
//!
//! The transport is pluggable through [`transport::DdsParticipant`]; with the
//! `testing` feature, the `testing` module provides an in-memory one.

pub mod config;
pub mod context;
pub mod demangle;
pub mod error;
pub mod gid;
pub mod graph;
pub mod graph_cache;
pub mod listener;
pub mod names;
pub mod names_and_types;
pub mod participant;
pub mod prelude;
pub mod qos;
pub mod subscription;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;
pub mod type_registry;
pub mod type_support;

pub use error::{Result, RmwError, RmwRet};

/// Tag carried by every handle this crate hands out.
pub const RMW_DDS_IDENTIFIER: &str = "rmw_dds_rs";

/// Builds a configured object, consuming the builder.
///
/// Bring it into scope to call `.build()`:
///
/// ```rust
/// use rmw_dds::Builder;
/// use rmw_dds::context::ContextBuilder;
///
/// let ctx = ContextBuilder::default().build().unwrap();
/// ```
pub trait Builder {
    /// The type produced by this builder.
    type Output;
    /// Consume the builder and construct the configured object.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or if a transport
    /// resource could not be acquired.
    fn build(self) -> Result<Self::Output>;
}
