//! WebSocket layer: the transport edge of the in-app channel.
//!
//! Connections authenticate via the same gateway headers as the REST
//! surface, then register with the engine's
//! [`ConnectionRegistry`](fileops_notify::ConnectionRegistry).

pub mod handler;
