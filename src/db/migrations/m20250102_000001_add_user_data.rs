use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create favorites table
        manager
            .create_table(
                Table::create()
                    .table(Favorites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Favorites::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Favorites::ProfileId).string().not_null())
                    .col(ColumnDef::new(Favorites::ContentId).string().not_null())
                    .col(ColumnDef::new(Favorites::ItemType).string().not_null())
                    .col(ColumnDef::new(Favorites::Name).string().not_null())
                    .col(ColumnDef::new(Favorites::StreamIcon).string())
                    .col(
                        ColumnDef::new(Favorites::AddedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create watch_history table
        manager
            .create_table(
                Table::create()
                    .table(WatchHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WatchHistory::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WatchHistory::ProfileId).string().not_null())
                    .col(ColumnDef::new(WatchHistory::ContentId).string().not_null())
                    .col(ColumnDef::new(WatchHistory::ItemType).string().not_null())
                    .col(ColumnDef::new(WatchHistory::Name).string().not_null())
                    .col(ColumnDef::new(WatchHistory::StreamIcon).string())
                    .col(
                        ColumnDef::new(WatchHistory::WatchedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(WatchHistory::DurationSecs).integer())
                    .col(ColumnDef::new(WatchHistory::PositionSecs).integer())
                    .to_owned(),
            )
            .await?;

        // Create settings table
        manager
            .create_table(
                Table::create()
                    .table(Settings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Settings::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Settings::Value).json().not_null())
                    .col(
                        ColumnDef::new(Settings::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_favorites_profile_type")
                    .table(Favorites::Table)
                    .col(Favorites::ProfileId)
                    .col(Favorites::ItemType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watch_history_profile_type")
                    .table(WatchHistory::Table)
                    .col(WatchHistory::ProfileId)
                    .col(WatchHistory::ItemType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_watch_history_profile_watched")
                    .table(WatchHistory::Table)
                    .col(WatchHistory::ProfileId)
                    .col(WatchHistory::WatchedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WatchHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Favorites::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Favorites {
    Table,
    Id,
    ProfileId,
    ContentId,
    ItemType,
    Name,
    StreamIcon,
    AddedAt,
}

#[derive(Iden)]
enum WatchHistory {
    Table,
    Id,
    ProfileId,
    ContentId,
    ItemType,
    Name,
    StreamIcon,
    WatchedAt,
    DurationSecs,
    PositionSecs,
}

#[derive(Iden)]
enum Settings {
    Table,
    Key,
    Value,
    UpdatedAt,
}
