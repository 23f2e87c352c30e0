//! 端到端测试模块
//!
//! 测试完整的计量场景

#[allow(unused_imports)]
mod concurrent_access;
#[allow(unused_imports)]
mod hourly_quota;
