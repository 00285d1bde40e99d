//! Client side of the remote debug protocol used to reach a DPU debug stub.

pub mod client;
pub mod connection;

pub mod packets {
    pub mod psm;
    pub mod reply;
    pub mod request;
    pub mod writer;
}

pub use client::{RemoteClient, RemoteError};
pub use connection::Connection;
pub use packets::reply::{Reply, StopReply};
pub use packets::request::Request;
