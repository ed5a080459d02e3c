//! # Topoagent Topology
//!
//! The generic component/relation model topology collectors emit, plus
//! the narrow check boundary the agent consumes them through.
//!
//! A collector polls some external API (a container orchestrator, a
//! CMDB, a process manager), maps what it finds into components and
//! relations, and emits them as an instance-scoped snapshot. The agent
//! core never parses collector payloads; it only keeps the process that
//! hosts them alive.

pub mod check;
pub mod model;

// Re-exports
pub use check::{CheckError, InstanceConfig, TopologyCheck, single_instance};
pub use model::{Component, InstanceKey, Relation, TopologySnapshot, TypeDescriptor};
