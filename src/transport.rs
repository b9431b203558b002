//! Transport
//!
//! The engine's only way of talking to nodes. Implementations own framing,
//! connections and pooling; the engine only sees the classified outcome.

use crate::cluster::Node;
use crate::error::NodeError;
use crate::response::Response;
use crate::statement::Statement;
use async_trait::async_trait;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `statement` to `node` and wait for its answer. Network failures
    /// are reported as `NodeError::ConnectionError`; the engine applies its
    /// own per-attempt timeout on top of this call.
    async fn send(&self, node: &Node, statement: &Statement) -> Result<Response, NodeError>;
}
