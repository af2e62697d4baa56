//! turnq CLI — exercise a queue against a simulated flaky upstream.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use turnq::config::QueueConfig;
use turnq::error::RequestError;
use turnq::queue::RequestQueue;
use turnq::telemetry::init_tracing;

#[derive(Parser)]
#[command(name = "turnq", about = "Bounded-concurrency request queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the effective configuration loaded from the environment
    Config,
    /// Flood the queue with simulated requests and report settlements
    Flood {
        /// Number of requests to submit
        #[arg(long, default_value_t = 10)]
        requests: usize,
        /// Concurrency ceiling (overrides TURNQ_CONCURRENCY)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Simulated upstream latency per attempt, in milliseconds
        #[arg(long, default_value_t = 300)]
        latency_ms: u64,
        /// Every n-th request fails transiently before succeeding (0 = none)
        #[arg(long, default_value_t = 4)]
        flaky_every: usize,
        /// How many 503s a flaky request returns before succeeding
        #[arg(long, default_value_t = 2)]
        flaky_failures: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Config => cmd_config(),
        Command::Flood {
            requests,
            concurrency,
            latency_ms,
            flaky_every,
            flaky_failures,
        } => cmd_flood(requests, concurrency, latency_ms, flaky_every, flaky_failures).await,
    }
}

fn cmd_config() -> anyhow::Result<()> {
    let config = QueueConfig::from_env()?;

    println!("Concurrency:    {}", config.concurrency);
    println!("Max retries:    {}", config.retry.max_retries);
    println!("Base delay:     {}ms", config.retry.base_delay.as_millis());
    println!("Retry unknown:  {}", config.retry.retry_unknown);
    println!("Event capacity: {}", config.event_capacity);
    println!("Log level:      {}", config.log_level);
    Ok(())
}

async fn cmd_flood(
    requests: usize,
    concurrency: Option<usize>,
    latency_ms: u64,
    flaky_every: usize,
    flaky_failures: u32,
) -> anyhow::Result<()> {
    let mut config = QueueConfig::from_env()?;
    if let Some(n) = concurrency {
        config = config.concurrency(n);
    }
    init_tracing(&config.log_level)?;

    let queue = RequestQueue::new(config);

    // Stream queue events to stdout as they happen
    let mut events = queue.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Ok(kind) = serde_json::to_string(&event.kind) {
                println!("[{:>4}] {kind}", event.seq);
            }
        }
    });

    let started = Instant::now();
    let mut tickets = Vec::with_capacity(requests);

    for i in 0..requests {
        let flaky = flaky_every != 0 && i % flaky_every == 0;
        let attempts = Arc::new(AtomicU32::new(0));

        let ticket = queue.submit(move || {
            let attempts = Arc::clone(&attempts);
            async move {
                tokio::time::sleep(Duration::from_millis(latency_ms)).await;
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                if flaky && attempt < flaky_failures {
                    Err(RequestError::Status {
                        code: 503,
                        message: "simulated upstream overload".to_string(),
                    })
                } else {
                    Ok(format!("response {i}"))
                }
            }
        });
        tickets.push(ticket);
    }

    // Watch the last request work its way to the front
    if let Some(last) = tickets.last() {
        let id = last.id();
        queue.observe(id, move |position, total| {
            println!("       watched {id}: position {position} of {total}");
        });
    }

    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for ticket in tickets {
        let id = ticket.id();
        match ticket.wait().await {
            Ok(response) => {
                succeeded += 1;
                println!("       {id} -> {response}");
            }
            Err(e) => {
                failed += 1;
                println!("       {id} -> error: {e}");
            }
        }
    }

    println!(
        "\n{requests} request(s): {succeeded} succeeded, {failed} failed in {:.1}s",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}
