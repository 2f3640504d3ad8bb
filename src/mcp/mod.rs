pub mod content;
pub mod rpc;
pub mod server;
