pub mod error;
pub mod jsonrpc;
pub mod logs;
pub mod store;
pub mod tools;
