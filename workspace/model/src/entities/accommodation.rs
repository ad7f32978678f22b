use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::user;

/// Represents a PG/hostel listing put up by an owner.
/// Amenities are stored as a JSON array of free-form strings.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accommodations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The owner this listing belongs to. Must hold the `owner` role;
    /// the listing only surfaces publicly once that owner is approved.
    pub owner_id: i32,
    pub name: String,
    pub description: String,
    pub address: String,
    /// Monthly price.
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub price: Decimal,
    pub amenities: Json,
    pub created_at: NaiveDateTime,
}

impl Model {
    /// Amenities as a plain string list; tolerates legacy rows with
    /// malformed JSON by returning an empty list.
    pub fn amenity_list(&self) -> Vec<String> {
        serde_json::from_value(self.amenities.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::OwnerId",
        to = "user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::accommodation_image::Entity")]
    AccommodationImage,
    #[sea_orm(has_many = "super::booking::Entity")]
    Booking,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::accommodation_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccommodationImage.def()
    }
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
