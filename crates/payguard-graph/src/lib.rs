//! # Payguard Graph
//!
//! Sliding-window directed transaction graph and the topological fraud
//! signals read from it:
//! - Fraud rings: directed cycles of transactions within the window
//! - Mule accounts: nodes with high in- and out-degree
//! - Velocity bursts: many outgoing transactions in the last hour
//!
//! Expiry is driven by event time (the timestamp of the transaction being
//! inserted); velocity uses wall-clock time. The split is intentional: the
//! window tracks the stream, while a burst is only a burst if it is
//! happening now.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod cycles;
mod graph;

pub use graph::{EdgeStats, RingAssessment, TransactionGraph, MAX_RING_SUBGRAPH_NODES};
