use crate::seed::Seeder;
use async_trait::async_trait;
use db::models::user::{Model, Role};
use fake::{Fake, faker::internet::en::SafeEmail};
use sea_orm::{DatabaseConnection, DbErr};

pub struct UserSeeder;

#[async_trait]
impl Seeder for UserSeeder {
    async fn seed(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        // Fixed accounts; reruns hit the unique username and are skipped.
        let _ = Model::create(db, "admin", "admin@example.com", Role::Admin).await;
        let _ = Model::create(db, "sensei", "sensei@example.com", Role::Instructor).await;
        let _ = Model::create(db, "student", "student@example.com", Role::Student).await;

        for _ in 0..20 {
            let username = format!("s{:07}", fastrand::u32(..10_000_000));
            let email: String = SafeEmail().fake();
            let _ = Model::create(db, &username, &email, Role::Student).await;
        }
        Ok(())
    }
}
