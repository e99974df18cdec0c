use sqlx::{sqlite::SqliteRow, Row};

use concierge_core::domain::customer::{normalize_email, Customer, CustomerId};

use super::{format_timestamp, parse_timestamp, CustomerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerRepository {
    pool: DbPool,
}

impl SqlCustomerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, first_name, last_name, email, phone, created_at
             FROM customer
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(customer_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Customer>, RepositoryError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT id, first_name, last_name, email, phone, created_at
             FROM customer
             WHERE email = ? COLLATE NOCASE",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(customer_from_row).transpose()
    }

    async fn save(&self, customer: Customer) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customer (id, first_name, last_name, email, phone, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                email = excluded.email,
                phone = excluded.phone",
        )
        .bind(customer.id.0)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(normalize_email(&customer.email))
        .bind(customer.phone.as_deref())
        .bind(format_timestamp(&customer.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn customer_from_row(row: SqliteRow) -> Result<Customer, RepositoryError> {
    Ok(Customer {
        id: CustomerId(row.try_get("id")?),
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use concierge_core::domain::customer::{Customer, CustomerId};

    use super::SqlCustomerRepository;
    use crate::repositories::CustomerRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    #[tokio::test]
    async fn customer_round_trip_and_case_insensitive_email_lookup() {
        let pool = setup_pool().await;
        let repo = SqlCustomerRepository::new(pool.clone());
        let customer = Customer {
            id: CustomerId(7),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: Some("+44 20 7946 0000".to_string()),
            created_at: parse_ts("2026-04-01T10:00:00Z"),
        };

        repo.save(customer.clone()).await.expect("save customer");

        assert_eq!(repo.find_by_id(&CustomerId(7)).await.expect("find"), Some(customer.clone()));
        assert_eq!(
            repo.find_by_email("  ADA@Example.com ").await.expect("find by email"),
            Some(customer)
        );
        assert_eq!(repo.find_by_email("nobody@example.com").await.expect("miss"), None);
        assert_eq!(repo.find_by_email("   ").await.expect("blank"), None);

        pool.close().await;
    }

    #[tokio::test]
    async fn save_updates_existing_customer_in_place() {
        let pool = setup_pool().await;
        let repo = SqlCustomerRepository::new(pool.clone());
        let mut customer = Customer {
            id: CustomerId(1),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: "grace@example.com".to_string(),
            phone: None,
            created_at: parse_ts("2026-04-01T10:00:00Z"),
        };
        repo.save(customer.clone()).await.expect("insert");

        customer.phone = Some("555-0100".to_string());
        repo.save(customer.clone()).await.expect("update");

        let stored = repo.find_by_id(&CustomerId(1)).await.expect("find").expect("present");
        assert_eq!(stored.phone.as_deref(), Some("555-0100"));

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }
}
