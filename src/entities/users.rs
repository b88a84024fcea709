use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub email: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Base64 encoded image
    pub profile_photo: Option<String>,

    pub is_active: bool,

    pub deactivated_at: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sequences::Entity")]
    Sequences,
}

impl Related<super::sequences::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sequences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
