//! Deep health check: verifies PostgreSQL and Redis connectivity.

use actix_web::{web, HttpResponse};
use diesel::prelude::*;

use crate::db::DbPool;
use crate::redis_pool::RedisPool;

async fn postgres_up(pool: &DbPool) -> bool {
    let pool = pool.clone();
    let result = web::block(move || -> Result<(), anyhow::Error> {
        let mut conn = pool.get()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    })
    .await;
    matches!(result, Ok(Ok(())))
}

async fn redis_up(pool: &RedisPool) -> bool {
    let Ok(mut conn) = pool.get().await else {
        return false;
    };
    redis::cmd("PING")
        .query_async::<_, String>(&mut *conn)
        .await
        .is_ok()
}

/// GET /health
pub async fn health_check(
    db: web::Data<DbPool>,
    redis: web::Data<RedisPool>,
) -> HttpResponse {
    let postgres = postgres_up(db.get_ref()).await;
    let redis_ok = redis_up(redis.get_ref()).await;

    let body = serde_json::json!({
        "status": if postgres && redis_ok { "ok" } else { "degraded" },
        "postgresql": if postgres { "up" } else { "down" },
        "redis": if redis_ok { "up" } else { "down" },
    });

    if postgres && redis_ok {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
