//! Create `image_tags` join table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ImageTags::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImageTags::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ImageTags::ImageId).uuid().not_null())
                    .col(ColumnDef::new(ImageTags::TagId).uuid().not_null())
                    .col(
                        ColumnDef::new(ImageTags::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ImageTags::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_image_tags_image")
                            .from(ImageTags::Table, ImageTags::ImageId)
                            .to(Images::Table, Images::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_image_tags_tag")
                            .from(ImageTags::Table, ImageTags::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_image_tag")
                    .table(ImageTags::Table)
                    .col(ImageTags::ImageId)
                    .col(ImageTags::TagId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_image_tags_tag_id")
                    .table(ImageTags::Table)
                    .col(ImageTags::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ImageTags::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ImageTags {
    Table,
    Id,
    ImageId,
    TagId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Images {
    Table,
    Id,
}

#[derive(Iden)]
enum Tags {
    Table,
    Id,
}
