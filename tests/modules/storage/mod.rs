//! 存储模块测试
//!
//! 包含计数存储和对象存储的单元测试和集成测试
