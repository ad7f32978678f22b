use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The role a user acts under. Roles are mutually exclusive and fixed
/// at registration; an admin may reassign them later.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "student")]
    Student,
    #[sea_orm(string_value = "owner")]
    Owner,
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Student => "student",
            Role::Owner => "owner",
            Role::Admin => "admin",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// Role with the approval state folded in. Only owners carry an approval
/// gate; students and admins are always fully privileged for their role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleStatus {
    Student,
    Admin,
    Owner { approved: bool },
}

impl RoleStatus {
    /// Approval state a freshly registered user starts with.
    pub fn default_approval(role: Role) -> bool {
        match role {
            Role::Student | Role::Admin => true,
            Role::Owner => false,
        }
    }
}

/// Represents a registered user of the marketplace.
/// The phone number is the login identity and is stored normalized
/// to the `+91` international prefix.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub phone: String,
    #[sea_orm(unique)]
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
    /// Only meaningful for owners; required at owner registration.
    pub company_name: Option<String>,
    /// Business registration identifier, required at owner registration.
    pub business_registration: Option<String>,
    /// Admin-controlled gate. Owners start unapproved; everyone else
    /// starts approved.
    pub is_approved: bool,
    pub phone_verified: bool,
    pub email_verified: bool,
    pub created_at: NaiveDateTime,
}

impl Model {
    pub fn role_status(&self) -> RoleStatus {
        match self.role {
            Role::Student => RoleStatus::Student,
            Role::Admin => RoleStatus::Admin,
            Role::Owner => RoleStatus::Owner {
                approved: self.is_approved,
            },
        }
    }

    /// Whether this user's accommodations may appear in public listings.
    pub fn listings_visible(&self) -> bool {
        matches!(self.role_status(), RoleStatus::Owner { approved: true })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// An owner can list multiple accommodations.
    #[sea_orm(has_many = "super::accommodation::Entity")]
    Accommodation,
    /// A student can raise multiple booking requests.
    #[sea_orm(has_many = "super::booking::Entity")]
    Booking,
}

impl Related<super::accommodation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accommodation.def()
    }
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
