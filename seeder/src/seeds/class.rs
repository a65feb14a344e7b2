use crate::seed::Seeder;
use crate::seeds::LOCATIONS;
use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use db::models::class::{Model, NewClass};
use sea_orm::{DatabaseConnection, DbErr};

pub struct ClassSeeder;

/// (name, discipline, start hour, length in minutes)
const DAILY_SLOTS: [(&str, &str, u32, i64); 3] = [
    ("Morning Kata", "Karate", 7, 60),
    ("Youth Judo", "Judo", 16, 60),
    ("Evening Karate", "Karate", 18, 90),
];

#[async_trait]
impl Seeder for ClassSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let today = Utc::now().date_naive();

        for day in 0..7 {
            let class_date = today + Duration::days(day);
            for location in LOCATIONS {
                for (name, discipline, hour, minutes) in DAILY_SLOTS {
                    let start_time = NaiveTime::from_hms_opt(hour, 0, 0)
                        .ok_or_else(|| DbErr::Custom(format!("invalid start hour {hour}")))?;
                    Model::create(
                        db,
                        NewClass {
                            name: name.to_string(),
                            discipline: discipline.to_string(),
                            location: location.to_string(),
                            class_date,
                            start_time,
                            end_time: start_time + Duration::minutes(minutes),
                            instructor_id: None,
                        },
                    )
                    .await?;
                }
            }
        }
        Ok(())
    }
}
