use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create users table
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Phone).unique_key())
                    .col(string_null(Users::Email).unique_key())
                    .col(string(Users::PasswordHash))
                    .col(string(Users::Role))
                    .col(string_null(Users::CompanyName))
                    .col(string_null(Users::BusinessRegistration))
                    .col(boolean(Users::IsApproved))
                    .col(boolean(Users::PhoneVerified).default(false))
                    .col(boolean(Users::EmailVerified).default(false))
                    .col(timestamp(Users::CreatedAt))
                    .to_owned(),
            )
            .await?;

        // Create accommodations table
        manager
            .create_table(
                Table::create()
                    .table(Accommodations::Table)
                    .if_not_exists()
                    .col(pk_auto(Accommodations::Id))
                    .col(integer(Accommodations::OwnerId))
                    .col(string(Accommodations::Name))
                    .col(string(Accommodations::Description))
                    .col(string(Accommodations::Address))
                    .col(decimal_len(Accommodations::Price, 10, 2))
                    .col(json(Accommodations::Amenities))
                    .col(timestamp(Accommodations::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accommodation_owner")
                            .from(Accommodations::Table, Accommodations::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create accommodation_images table
        manager
            .create_table(
                Table::create()
                    .table(AccommodationImages::Table)
                    .if_not_exists()
                    .col(pk_auto(AccommodationImages::Id))
                    .col(integer(AccommodationImages::AccommodationId))
                    .col(string(AccommodationImages::Url))
                    .col(string(AccommodationImages::PublicId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_image_accommodation")
                            .from(
                                AccommodationImages::Table,
                                AccommodationImages::AccommodationId,
                            )
                            .to(Accommodations::Table, Accommodations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create bookings table
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(pk_auto(Bookings::Id))
                    .col(integer(Bookings::StudentId))
                    .col(integer(Bookings::AccommodationId))
                    .col(string(Bookings::Status))
                    .col(string(Bookings::Message))
                    .col(timestamp(Bookings::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_student")
                            .from(Bookings::Table, Bookings::StudentId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booking_accommodation")
                            .from(Bookings::Table, Bookings::AccommodationId)
                            .to(Accommodations::Table, Accommodations::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Note: no unique index over (student, accommodation, status).
        // Duplicate pending bookings are screened by a read-then-write
        // check in the handler, not by the store.

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AccommodationImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accommodations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Phone,
    Email,
    PasswordHash,
    Role,
    CompanyName,
    BusinessRegistration,
    IsApproved,
    PhoneVerified,
    EmailVerified,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Accommodations {
    Table,
    Id,
    OwnerId,
    Name,
    Description,
    Address,
    Price,
    Amenities,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AccommodationImages {
    Table,
    Id,
    AccommodationId,
    Url,
    PublicId,
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    StudentId,
    AccommodationId,
    Status,
    Message,
    CreatedAt,
}
