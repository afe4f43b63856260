use clap::Parser;
use log::info;
use server::benchmark::{run_benchmark, BenchmarkOptions};
use server::config::WorldConfig;
use server::network::Server;
use shared::TICK_RATE;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Ticks per second
    #[arg(short, long, default_value_t = TICK_RATE)]
    tick_rate: u32,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    /// World generation and simulation seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Run ticks back-to-back without sleeping
    #[arg(long)]
    warp: bool,

    /// Run the timed benchmark instead of serving
    #[arg(long)]
    benchmark: bool,

    /// Ticks per benchmark run
    #[arg(long, default_value = "1000")]
    benchmark_ticks: u32,

    /// Number of benchmark runs
    #[arg(long, default_value = "5")]
    benchmark_runs: u32,

    /// Entities created before each benchmark run
    #[arg(long, default_value = "2000")]
    benchmark_entities: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = WorldConfig {
        tick_rate: args.tick_rate.max(1),
        seed: args.seed,
        ..Default::default()
    };

    if args.benchmark {
        let options = BenchmarkOptions {
            runs: args.benchmark_runs,
            ticks_per_run: args.benchmark_ticks,
            entities: args.benchmark_entities,
        };
        let report = run_benchmark(config, options);
        for (run, average) in report.run_averages.iter().enumerate() {
            println!("run {}: {:.3} ms/tick", run + 1, average.as_secs_f64() * 1000.0);
        }
        println!(
            "average: {:.3} ms/tick",
            report.overall_average.as_secs_f64() * 1000.0
        );
        return Ok(());
    }

    let address = format!("{}:{}", args.host, args.port);
    info!("Starting server on {} (seed {})", address, args.seed);

    let mut server = Server::new(&address, config, args.max_clients, args.warp).await?;
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            let _ = shutdown.send(server::network::ServerMessage::Shutdown);
        }
    });

    server.run().await?;
    Ok(())
}
