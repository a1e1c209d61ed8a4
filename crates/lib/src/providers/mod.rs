pub mod ai;
pub mod sheet;
pub mod storage;
