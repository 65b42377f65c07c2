//! 计数器状态表迁移
//!
//! 创建 counter_states 表，每个 barcode 一行：
//! - count：累计点击数
//! - clicks：最近点击记录（JSON 数组，最新在前）

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

/// MySQL 上 clicks 列的容量（MEDIUMTEXT，字节）
///
/// TEXT 只有 64 KiB，装不下 200 条满长度的点击记录。
pub const MYSQL_CLICKS_MAX_BYTES: usize = 16_777_215;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut clicks = ColumnDef::new(CounterStates::Clicks);
        match manager.get_database_backend() {
            DatabaseBackend::MySql => clicks.custom(Alias::new("MEDIUMTEXT")),
            // PostgreSQL / SQLite 的 TEXT 没有 64 KiB 限制
            _ => clicks.text(),
        };
        clicks.not_null();

        manager
            .create_table(
                Table::create()
                    .table(CounterStates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CounterStates::Barcode)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CounterStates::Count)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(clicks)
                    .col(
                        ColumnDef::new(CounterStates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 管理端按更新时间排查时使用
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_counter_states_updated_at")
                    .table(CounterStates::Table)
                    .col(CounterStates::UpdatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_counter_states_updated_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(CounterStates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CounterStates {
    #[sea_orm(iden = "counter_states")]
    Table,
    Barcode,
    Count,
    Clicks,
    UpdatedAt,
}
