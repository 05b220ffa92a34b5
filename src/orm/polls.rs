//! SeaORM Entity for polls table

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "polls")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_filename: Option<String>,
    pub event_date: Option<Date>,
    pub is_active: bool,
    /// Text of the winning option once the poll is resolved.
    pub outcome: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::poll_options::Entity")]
    PollOptions,
    #[sea_orm(has_many = "super::poll_votes::Entity")]
    PollVotes,
    #[sea_orm(has_many = "super::poll_comments::Entity")]
    PollComments,
}

impl Related<super::poll_options::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollOptions.def()
    }
}

impl Related<super::poll_votes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollVotes.def()
    }
}

impl Related<super::poll_comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PollComments.def()
    }
}

impl Model {
    pub fn is_resolved(&self) -> bool {
        self.outcome.is_some()
    }
}

impl ActiveModelBehavior for ActiveModel {}
