use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reports")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub sequence_id: i32,

    pub user_id: i32,

    pub report_type: String,

    /// JSON descriptor of the rendered file
    pub content: String,

    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sequences::Entity",
        from = "Column::SequenceId",
        to = "super::sequences::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Sequences,
}

impl Related<super::sequences::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sequences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
