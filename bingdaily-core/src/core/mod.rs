pub mod fetch;
pub mod request;
pub mod storage;
