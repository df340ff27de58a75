//! Ports: trait boundaries to external collaborators.

pub mod outbound;

pub use outbound::*;
