use storefront_checkout::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&pool).await?;

    let user_id = ensure_user(&pool, "Demo Customer", "customer@example.com").await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. User ID: {user_id}");
    Ok(())
}

async fn ensure_user(pool: &sqlx::PgPool, name: &str, email: &str) -> anyhow::Result<Uuid> {
    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email}");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let catalog = vec![
        (
            "Camiseta Básica",
            "Algodão orgânico",
            vec![("Branca", 7990_i64), ("Preta", 7990)],
        ),
        (
            "Tênis Corrida",
            "Leve e respirável",
            vec![("Azul 40", 29990), ("Azul 42", 29990), ("Cinza 41", 27990)],
        ),
        ("Boné Aba Curva", "Ajustável", vec![("Verde", 5990)]),
    ];

    for (name, description, variants) in catalog {
        let (product_id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO products (id, name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .await?;

        for (variant, price_in_cents) in variants {
            let exists: Option<(Uuid,)> = sqlx::query_as(
                "SELECT id FROM product_variants WHERE product_id = $1 AND name = $2",
            )
            .bind(product_id)
            .bind(variant)
            .fetch_optional(pool)
            .await?;
            if exists.is_some() {
                continue;
            }

            sqlx::query(
                r#"
                INSERT INTO product_variants (id, product_id, name, image_url, price_in_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(variant)
            .bind(format!("https://cdn.example.com/products/{product_id}/{variant}.png"))
            .bind(price_in_cents)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded catalog");
    Ok(())
}
