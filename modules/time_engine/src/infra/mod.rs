pub mod remote;
pub mod storage;
pub mod streaks;
