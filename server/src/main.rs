#![allow(dead_code)]

mod automation;
mod campaign;
mod db_core;
mod dispatch;
mod error;
mod insight;
mod limiter;
mod model;
mod notify;
mod routes;
mod server_config;
mod tasks;
#[cfg(test)]
mod testing;

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use axum::{extract::FromRef, Router};
use dispatch::{Dispatcher, Mailer, PushClient};
use limiter::{BackoffPolicy, CircuitBreaker, RateLimitedExecutor, RequestQueue};
use mimalloc::MiMalloc;
use routes::AppRouter;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use server_config::cfg;
use tokio::{signal, task::JoinHandle};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

pub type HttpClient = reqwest::Client;

#[derive(Clone, FromRef)]
struct ServerState {
    http_client: HttpClient,
    conn: Arc<DatabaseConnection>,
    ai_executor: Arc<RateLimitedExecutor>,
    insight_queue: RequestQueue<String>,
    dispatcher: Dispatcher,
    push_client: PushClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL is not set in .env file");
    let mut db_options = ConnectOptions::new(db_url);
    db_options.sqlx_logging(false);

    let conn = Database::connect(db_options)
        .await
        .expect("Database connection failed");

    let http_client = reqwest::ClientBuilder::new().use_rustls_tls().build()?;

    // One executor per protected dependency. The AI provider gets the full
    // breaker treatment; email/push retries live in the Dispatcher.
    let ai_executor = Arc::new(RateLimitedExecutor::new(
        CircuitBreaker::new(
            cfg.limiter.failure_threshold,
            Duration::from_millis(cfg.limiter.reset_timeout_ms),
        ),
        BackoffPolicy::new(
            Duration::from_millis(cfg.backoff.base_delay_ms),
            Duration::from_millis(cfg.backoff.max_delay_ms),
            cfg.backoff.jitter_factor,
        ),
        Duration::from_millis(cfg.limiter.min_interval_ms),
        Duration::from_millis(cfg.limiter.request_timeout_ms),
    ));
    let insight_queue = RequestQueue::new(
        ai_executor.clone(),
        Duration::from_millis(cfg.limiter.queue_timeout_ms),
        cfg.limiter.max_attempts,
    );

    let mailer = Mailer::from_config().expect("SMTP config is invalid");
    let push_client = PushClient::new(http_client.clone(), cfg.push.endpoint.clone());
    let dispatcher = Dispatcher::new(
        mailer,
        push_client.clone(),
        cfg.dispatch.max_attempts,
        Duration::from_millis(cfg.dispatch.retry_delay_ms),
    );

    let state = ServerState {
        http_client,
        conn: Arc::new(conn),
        ai_executor,
        insight_queue,
        dispatcher,
        push_client,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::Layer::default().with_ansi(false))
        .init();

    let router = AppRouter::create(state.clone());

    let mut scheduler = JobScheduler::new()
        .await
        .expect("Failed to create scheduler");

    {
        // Every 5 minutes, send campaigns whose schedule came due
        let state_clone = state.clone();
        scheduler
            .add(Job::new_async("0 */5 * * * *", move |uuid, mut l| {
                let state = state_clone.clone();
                Box::pin(async move {
                    match tasks::check_scheduled_campaigns(&state).await {
                        Ok(count) if count > 0 => {
                            tracing::info!("Campaign sweep {} triggered {} campaigns", uuid, count);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!("Campaign sweep failed: {:?}", e);
                        }
                    }

                    let next_tick = l.next_tick_for_job(uuid).await;
                    if let Ok(Some(ts)) = next_tick {
                        tracing::debug!("Next campaign sweep at {:?}", ts)
                    }
                })
            })?)
            .await?;

        // Every 5 minutes, advance due automation steps
        let state_clone = state.clone();
        scheduler
            .add(Job::new_async("0 */5 * * * *", move |uuid, mut l| {
                let state = state_clone.clone();
                Box::pin(async move {
                    match tasks::run_automation_queue(&state).await {
                        Ok(outcome) if outcome.processed > 0 => {
                            tracing::info!(
                                "Automation sweep {}: {} processed, {} sent, {} failed",
                                uuid,
                                outcome.processed,
                                outcome.sent,
                                outcome.failed
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!("Automation sweep failed: {:?}", e);
                        }
                    }

                    let next_tick = l.next_tick_for_job(uuid).await;
                    if let Ok(Some(ts)) = next_tick {
                        tracing::debug!("Next automation sweep at {:?}", ts)
                    }
                })
            })?)
            .await?;

        // Once a day, flush notifications deferred past quiet hours
        let state_clone = state.clone();
        let flush_cron = format!("0 0 {} * * *", cfg.quiet_hours.flush_hour);
        scheduler
            .add(Job::new_async(flush_cron.as_str(), move |uuid, _l| {
                let state = state_clone.clone();
                Box::pin(async move {
                    match tasks::flush_deferred_notifications(&state).await {
                        Ok(flushed) => {
                            tracing::info!("Deferred flush {} sent {} notifications", uuid, flushed);
                        }
                        Err(e) => {
                            tracing::error!("Deferred flush failed: {:?}", e);
                        }
                    }
                })
            })?)
            .await?;
    }

    scheduler.set_shutdown_handler(Box::new(move || {
        Box::pin(async move {
            tracing::info!("Shutting down scheduler");
        })
    }));

    println!("Starting scheduler...");
    match scheduler.start().await {
        Ok(_) => {
            println!("-------- SCHEDULER STARTED --------");
        }
        Err(e) => {
            println!("Failed to start scheduler: {:?}", e);
        }
    }

    let watch_handle = tasks::watch(state.clone());
    let server_handle = run_server(router, scheduler);
    tokio::select! {
        _ = server_handle => {
            tracing::info!("Server shut down, exiting");
        }
        _ = watch_handle => {
            tracing::info!("Watch loop ended");
        }
    }

    Ok(())
}

async fn shutdown_signal(mut scheduler: JobScheduler) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            scheduler.shutdown().await.unwrap();
            println!("Cleanups done, shutting down");
            std::process::exit(0);

        },
        _ = terminate => {
            scheduler.shutdown().await.unwrap();
            println!("Cleanups done, shutting down");
            std::process::exit(0);
        },
    }
}

fn run_server(router: Router, scheduler: JobScheduler) -> JoinHandle<()> {
    tokio::spawn(async {
        let port = env::var("PORT").unwrap_or("5006".to_string());
        tracing::info!("Shareplate comms server running on http://0.0.0.0:{}", port);
        println!("{}", *server_config::cfg);

        let addr = SocketAddr::from(([0, 0, 0, 0], port.parse::<u16>().unwrap()));
        tracing::debug!("listening on {addr}");
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal(scheduler))
        .await
        .unwrap();
    })
}
