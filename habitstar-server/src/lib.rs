pub mod rewards;
pub mod server;
pub mod storage;
