use chrono::{Duration, NaiveTime, Utc};

type UtcDateTime = chrono::DateTime<Utc>;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum OptionStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "full")]
    Full,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tour_options")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tour_id: Uuid,
    pub start_date: Date,
    pub start_time: Option<String>,
    pub capacity_total: i32,
    pub capacity_sold: i32,
    pub cut_off_hours: i32,
    pub status: OptionStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Seats still on sale according to the last read; advisory only.
    pub fn remaining(&self) -> i32 {
        (self.capacity_total - self.capacity_sold).max(0)
    }

    /// Start of the slot in UTC. A missing or malformed start time counts as midnight.
    pub fn starts_at(&self) -> UtcDateTime {
        let time = self
            .start_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
            .unwrap_or(NaiveTime::MIN);
        self.start_date.and_time(time).and_utc()
    }

    pub fn is_past_cut_off(&self, now: UtcDateTime) -> bool {
        let cut_off = self.starts_at() - Duration::hours(i64::from(self.cut_off_hours.max(0)));
        now > cut_off
    }

    pub fn is_bookable_now(&self) -> bool {
        self.status == OptionStatus::Open
            && self.remaining() > 0
            && !self.is_past_cut_off(Utc::now())
    }
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
