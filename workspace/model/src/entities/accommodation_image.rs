use sea_orm::entity::prelude::*;

use super::accommodation;

/// A hosted image attached to an accommodation. The `public_id` is the
/// media host's deletion handle; releasing it is part of deleting the
/// parent listing.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accommodation_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub accommodation_id: i32,
    pub url: String,
    pub public_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "accommodation::Entity",
        from = "Column::AccommodationId",
        to = "accommodation::Column::Id",
        on_delete = "Cascade"
    )]
    Accommodation,
}

impl Related<accommodation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accommodation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
