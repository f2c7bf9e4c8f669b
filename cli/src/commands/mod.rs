pub mod call;
pub mod health;
pub mod logs;
pub mod proxy;
pub mod tool;
