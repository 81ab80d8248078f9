use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use tour_booking_api::{
    config::AppConfig,
    db::{OrmConn, create_orm_conn, run_migrations},
    entity::{
        tour_options::{self, OptionStatus},
        tours::{self, Entity as Tours},
    },
    middleware::auth::issue_token,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    seed_tours(&orm).await?;

    let admin_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();
    let ttl = Duration::days(7);
    println!(
        "Admin token ({admin_id}): {}",
        issue_token(&config.jwt_secret, admin_id, "admin", ttl)?
    );
    println!(
        "User token ({user_id}): {}",
        issue_token(&config.jwt_secret, user_id, "user", ttl)?
    );
    Ok(())
}

async fn seed_tours(orm: &OrmConn) -> anyhow::Result<()> {
    let catalogue = vec![
        ("Ha Long Bay Day Cruise", "Quang Ninh", 1_200_000, 30),
        ("Hoi An Lantern Walk", "Quang Nam", 350_000, 15),
        ("Sapa Trekking Weekend", "Lao Cai", 2_500_000, 12),
        ("Mekong Delta Floating Market", "Can Tho", 800_000, 20),
    ];

    let first_day = Utc::now().date_naive() + Duration::days(7);
    for (title, destination, price, seats) in catalogue {
        let existing = Tours::find()
            .filter(tours::Column::Title.eq(title))
            .one(orm)
            .await?;
        if existing.is_some() {
            println!("Tour {title} already present");
            continue;
        }

        let now = Utc::now().fixed_offset();
        let tour = tours::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            destination: Set(destination.to_string()),
            price: Set(price),
            is_active: Set(true),
            created_at: Set(now),
        }
        .insert(orm)
        .await?;

        for offset in 0..3 {
            let start_date: NaiveDate = first_day + Duration::days(offset * 7);
            tour_options::ActiveModel {
                id: Set(Uuid::new_v4()),
                tour_id: Set(tour.id),
                start_date: Set(start_date),
                start_time: Set(Some("08:00".to_string())),
                capacity_total: Set(seats),
                capacity_sold: Set(0),
                cut_off_hours: Set(2),
                status: Set(OptionStatus::Open),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(orm)
            .await?;
        }
        println!("Seeded tour {title} with 3 departures");
    }

    Ok(())
}
