use sqlx::migrate::Migrator;

/// 内嵌的数据库迁移脚本，位于仓库根目录的 `migrations/`。
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
