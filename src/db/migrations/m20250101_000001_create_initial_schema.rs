use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create profiles table
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Profiles::Name).string().not_null())
                    .col(ColumnDef::new(Profiles::Url).string().not_null())
                    .col(ColumnDef::new(Profiles::Username).string().not_null())
                    .col(ColumnDef::new(Profiles::Password).string().not_null())
                    .col(ColumnDef::new(Profiles::Format).string())
                    .col(
                        ColumnDef::new(Profiles::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Profiles::LastUsed).timestamp())
                    .col(ColumnDef::new(Profiles::CachedUserInfo).json())
                    .col(ColumnDef::new(Profiles::CachedServerInfo).json())
                    .to_owned(),
            )
            .await?;

        // Create categories table
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::ProfileId).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .col(ColumnDef::new(Categories::RemoteId).string().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::ParentId).string())
                    .col(
                        ColumnDef::new(Categories::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // Create content_items table
        manager
            .create_table(
                Table::create()
                    .table(ContentItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContentItems::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContentItems::ProfileId).string().not_null())
                    .col(ColumnDef::new(ContentItems::Kind).string().not_null())
                    .col(ColumnDef::new(ContentItems::RemoteId).string().not_null())
                    .col(ColumnDef::new(ContentItems::CategoryId).string().not_null())
                    .col(ColumnDef::new(ContentItems::Name).string().not_null())
                    .col(ColumnDef::new(ContentItems::StreamIcon).string())
                    .col(
                        ColumnDef::new(ContentItems::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ContentItems::Data).json().not_null())
                    .col(
                        ColumnDef::new(ContentItems::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create episodes table
        manager
            .create_table(
                Table::create()
                    .table(Episodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Episodes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Episodes::ProfileId).string().not_null())
                    .col(ColumnDef::new(Episodes::ShowId).string().not_null())
                    .col(ColumnDef::new(Episodes::RemoteId).string().not_null())
                    .col(ColumnDef::new(Episodes::Season).integer().not_null())
                    .col(ColumnDef::new(Episodes::EpisodeNum).integer().not_null())
                    .col(ColumnDef::new(Episodes::Data).json().not_null())
                    .to_owned(),
            )
            .await?;

        // Create content_downloads table
        manager
            .create_table(
                Table::create()
                    .table(ContentDownloads::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContentDownloads::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContentDownloads::ProfileId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ContentDownloads::Kind).string().not_null())
                    .col(
                        ColumnDef::new(ContentDownloads::ItemCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ContentDownloads::DownloadedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes for the profile-scoped lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_categories_profile_kind")
                    .table(Categories::Table)
                    .col(Categories::ProfileId)
                    .col(Categories::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_content_items_profile_kind")
                    .table(ContentItems::Table)
                    .col(ContentItems::ProfileId)
                    .col(ContentItems::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_content_items_profile_kind_category")
                    .table(ContentItems::Table)
                    .col(ContentItems::ProfileId)
                    .col(ContentItems::Kind)
                    .col(ContentItems::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_episodes_profile_show")
                    .table(Episodes::Table)
                    .col(Episodes::ProfileId)
                    .col(Episodes::ShowId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_content_downloads_profile")
                    .table(ContentDownloads::Table)
                    .col(ContentDownloads::ProfileId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContentDownloads::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Episodes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContentItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Profiles {
    Table,
    Id,
    Name,
    Url,
    Username,
    Password,
    Format,
    IsActive,
    CreatedAt,
    LastUsed,
    CachedUserInfo,
    CachedServerInfo,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    ProfileId,
    Kind,
    RemoteId,
    Name,
    ParentId,
    Position,
}

#[derive(Iden)]
enum ContentItems {
    Table,
    Id,
    ProfileId,
    Kind,
    RemoteId,
    CategoryId,
    Name,
    StreamIcon,
    Position,
    Data,
    UpdatedAt,
}

#[derive(Iden)]
enum Episodes {
    Table,
    Id,
    ProfileId,
    ShowId,
    RemoteId,
    Season,
    EpisodeNum,
    Data,
}

#[derive(Iden)]
enum ContentDownloads {
    Table,
    Id,
    ProfileId,
    Kind,
    ItemCount,
    DownloadedAt,
}
