use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use gateway_crypto_core::{Sealer, TokenSigner};
use tracing::info;

use server::config::Config;
use server::db;
use server::handlers::{auth, dashboard, health, merchants, payments, wallets};
use server::middleware::{BearerAuth, HmacAuth, RateLimit, RequestIdMiddleware};
use server::ports::{KvStore, LedgerStore, MerchantDirectory, WebhookDeliveryStore};
use server::redis_pool::{init_redis_pool, RedisKvStore};
use server::services::{AuthService, LedgerService, MerchantService, ReportingService, WebhookNotifier};
use server::stores::{PgLedgerStore, PgMerchantDirectory, PgWebhookDeliveryStore};
use server::telemetry;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_telemetry();

    info!("Starting payment gateway");

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = db::create_pool(&config.database.url, config.database.max_connections)
        .context("Failed to create database pool")?;
    info!("Database connection pool created");

    let redis_pool = init_redis_pool(&config.redis.url).context("Failed to create Redis pool")?;

    let sealer = Arc::new(
        Sealer::from_hex_key(&config.aes_key_hex)
            .map_err(|e| anyhow::anyhow!("AES_KEY rejected: {e}"))?,
    );
    let token_signer = Arc::new(TokenSigner::new(
        &config.token.secret,
        config.token.expiry_secs,
        &config.token.issuer,
    ));

    let kv: Arc<dyn KvStore> = Arc::new(RedisKvStore::new(redis_pool.clone()));
    let ledger_store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));
    let directory: Arc<dyn MerchantDirectory> = Arc::new(PgMerchantDirectory::new(pool.clone()));
    let deliveries: Arc<dyn WebhookDeliveryStore> =
        Arc::new(PgWebhookDeliveryStore::new(pool.clone()));

    let ledger = web::Data::new(LedgerService::new(
        Arc::clone(&ledger_store),
        Arc::clone(&kv),
        Arc::clone(&sealer),
    ));
    let notifier = web::Data::new(WebhookNotifier::new(
        Arc::clone(&directory),
        Arc::clone(&deliveries),
        Arc::clone(&sealer),
    ));
    let auth_service = web::Data::new(AuthService::new(
        pool.clone(),
        Arc::clone(&sealer),
        Arc::clone(&token_signer),
    ));
    let merchant_service = web::Data::new(MerchantService::new(pool.clone(), Arc::clone(&sealer)));
    let reporting = web::Data::new(ReportingService::new(pool.clone(), Arc::clone(&sealer)));

    let bind_addr = (config.server.host.clone(), config.server.port);
    info!("Listening on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(redis_pool.clone()))
            .app_data(ledger.clone())
            .app_data(notifier.clone())
            .app_data(auth_service.clone())
            .app_data(merchant_service.clone())
            .app_data(reporting.clone())
            .app_data(web::JsonConfig::default().limit(1024 * 1024))
            .route("/health", web::get().to(health::health_check))
            .service(
                web::scope("/api/v1")
                    // Public: registration + login, each with its own limit.
                    .service(
                        web::scope("/auth")
                            .service(
                                web::resource("/register")
                                    .wrap(RateLimit::for_group(Arc::clone(&kv), "auth_register"))
                                    .route(web::post().to(auth::register)),
                            )
                            .service(
                                web::resource("/login")
                                    .wrap(RateLimit::for_group(Arc::clone(&kv), "auth_login"))
                                    .route(web::post().to(auth::login)),
                            ),
                    )
                    // Merchant API: HMAC-signed money movement. The gate runs
                    // first, so the limiter keys on the merchant identity.
                    .service(
                        web::scope("/payments")
                            .wrap(HmacAuth::new(
                                Arc::clone(&directory),
                                Arc::clone(&kv),
                                Arc::clone(&sealer),
                            ))
                            .service(
                                web::resource("")
                                    .wrap(RateLimit::for_group(Arc::clone(&kv), "payments"))
                                    .route(web::post().to(payments::process_payment)),
                            )
                            .service(
                                web::resource("/refund")
                                    .wrap(RateLimit::for_group(
                                        Arc::clone(&kv),
                                        "payments_refund",
                                    ))
                                    .route(web::post().to(payments::process_refund)),
                            ),
                    )
                    // Dashboard: bearer-token sessions.
                    .service(
                        web::scope("/wallets")
                            .wrap(BearerAuth::new(Arc::clone(&token_signer)))
                            .service(
                                web::resource("/topup")
                                    .wrap(RateLimit::for_group(Arc::clone(&kv), "wallets_topup"))
                                    .route(web::post().to(wallets::topup)),
                            )
                            .service(
                                web::resource("/balance")
                                    .wrap(RateLimit::for_group(Arc::clone(&kv), "dashboard"))
                                    .route(web::get().to(wallets::balance)),
                            ),
                    )
                    .service(
                        web::scope("/dashboard")
                            .wrap(RateLimit::for_group(Arc::clone(&kv), "dashboard"))
                            .wrap(BearerAuth::new(Arc::clone(&token_signer)))
                            .route("/stats", web::get().to(dashboard::stats)),
                    )
                    .service(
                        web::scope("/transactions")
                            .wrap(RateLimit::for_group(Arc::clone(&kv), "dashboard"))
                            .wrap(BearerAuth::new(Arc::clone(&token_signer)))
                            .route("", web::get().to(dashboard::list_transactions)),
                    )
                    .service(
                        web::scope("/merchants/me")
                            .wrap(RateLimit::for_group(Arc::clone(&kv), "dashboard"))
                            .wrap(BearerAuth::new(Arc::clone(&token_signer)))
                            .route("", web::get().to(merchants::get_profile))
                            .route("/webhook", web::put().to(merchants::update_webhook))
                            .route("/rotate-keys", web::post().to(merchants::rotate_keys)),
                    ),
            )
    })
    .bind(bind_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")?;

    Ok(())
}
