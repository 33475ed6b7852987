//! API 핸들러 모듈.

pub mod clients;
pub mod health;
pub mod metrics;
