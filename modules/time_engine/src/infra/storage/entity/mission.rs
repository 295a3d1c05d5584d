use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "missions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub mission_type: String,
    pub time_reward: i64,
    pub xp_reward: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_mission::Entity")]
    UserMission,
}

impl Related<super::user_mission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserMission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
