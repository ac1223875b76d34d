//! 集成测试支撑
//!
//! 在内存存储之上组装完整的用例服务，并提供快速构造用户、房间、消息的工厂方法。

pub mod test_data_factory;
pub mod test_environment;

// 重新导出常用类型
pub use test_data_factory::*;
pub use test_environment::*;
