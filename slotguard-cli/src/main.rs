mod server;
mod handlers;

use clap::{Parser, Subcommand};

use slotguard_core::config::{LeaseConfig, SchedulingConfig};

#[derive(Parser)]
#[command(
    name = "slotguard",
    about = "Slotguard: timetable conflict checks and lease-guarded enrollment",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Slotguard HTTP scheduling server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3100")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Storage backend: "memory" or "sqlite:<path>"
        #[arg(long, default_value = "memory", env = "SLOTGUARD_STORAGE")]
        storage: String,

        /// Lease time-to-live in milliseconds
        #[arg(long, default_value = "5000", env = "SLOTGUARD_LEASE_TTL_MS")]
        lease_ttl_ms: u64,

        /// Retries after the first failed lease attempt
        #[arg(long, default_value = "10", env = "SLOTGUARD_RETRY_COUNT")]
        retry_count: u32,

        /// Base pause between lease attempts in milliseconds
        #[arg(long, default_value = "100", env = "SLOTGUARD_RETRY_DELAY_MS")]
        retry_delay_ms: u64,

        /// Upper bound of the random extra pause in milliseconds
        #[arg(long, default_value = "100", env = "SLOTGUARD_RETRY_JITTER_MS")]
        retry_jitter_ms: u64,

        /// Pause inside the timetable critical section (testing only)
        #[arg(long, default_value = "0", env = "SLOTGUARD_CRITICAL_SECTION_DELAY_MS")]
        critical_section_delay_ms: u64,

        /// Also take a per-student lease around enrollment
        #[arg(long, env = "SLOTGUARD_LOCK_STUDENT_ENROLLMENTS")]
        lock_student_enrollments: bool,
    },

    /// Report clashing pairs in a JSON array of slots read from stdin
    Check,

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            host,
            storage,
            lease_ttl_ms,
            retry_count,
            retry_delay_ms,
            retry_jitter_ms,
            critical_section_delay_ms,
            lock_student_enrollments,
        } => {
            let config = SchedulingConfig {
                lease: LeaseConfig {
                    ttl_ms: lease_ttl_ms,
                    retry_count,
                    retry_delay_ms,
                    retry_jitter_ms,
                },
                critical_section_delay_ms,
                lock_student_enrollments,
            };
            if let Err(e) = server::run(&host, port, &storage, config).await {
                tracing::error!("Server stopped: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Check => {
            eprintln!("Reading slots from stdin...");
            match check_stdin() {
                Ok(report) => println!("{}", report),
                Err(e) => {
                    eprintln!("{}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Version => {
            println!("slotguard {}", env!("CARGO_PKG_VERSION"));
            println!("Weekly timetable conflict detection with lease-guarded writes");
        }
    }
}

fn check_stdin() -> Result<String, String> {
    let mut input = String::new();
    std::io::Read::read_to_string(&mut std::io::stdin(), &mut input)
        .map_err(|e| format!("Failed to read stdin: {}", e))?;

    let slots: Vec<handlers::SlotRequest> =
        serde_json::from_str(&input).map_err(|e| format!("Invalid JSON slot list: {}", e))?;

    let report = handlers::clash_report(&slots).map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(&report).map_err(|e| e.to_string())
}
