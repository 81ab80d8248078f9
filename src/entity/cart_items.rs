use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cart_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub item_type: String,
    pub tour_id: Uuid,
    pub option_id: Uuid,
    pub quantity: i32,
    /// Tour price captured when the line was added.
    pub unit_price: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tours::Entity",
        from = "Column::TourId",
        to = "super::tours::Column::Id"
    )]
    Tours,
}

impl Related<super::tours::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tours.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
