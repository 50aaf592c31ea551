// Talon decision & learning engine
// Operational CLI over the experience log and learning loop

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use talon_engine::config::Config;
use talon_engine::db::Database;
use talon_engine::learning::LearningLoop;
use talon_engine::telemetry::{init_telemetry, init_telemetry_with_level};

#[derive(Parser)]
#[command(name = "talon", about = "Mission learning loop inspection", version)]
struct Cli {
    /// Path to a config file (defaults to ~/.talon/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the aggregate performance report
    Report {
        /// Emit raw JSON instead of a text summary
        #[arg(long)]
        json: bool,
    },

    /// List the most recent attempts
    History {
        /// How many attempts to show
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Print the adaptive feedback a role prompt would receive
    Feedback {
        /// Agent role (strategist, planner, critic)
        #[arg(long)]
        role: String,

        /// Vulnerability type to scope the feedback to
        #[arg(long)]
        vuln_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry();

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // Re-initialize with the config-driven level (no-op if RUST_LOG is set)
    init_telemetry_with_level(&config.core.log_level);

    let db = Database::new(&config.experience_db_path()).await?;
    let learning = LearningLoop::new(
        db.experience(config.learning.capacity)
            .with_lookahead(config.learning.lookahead_factor),
        config.learning.clone(),
    );

    match cli.command {
        Command::Report { json } => {
            let report = learning.get_performance_report().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let overall = &report.overall_performance;
                println!("Performance report ({})", report.generated_at.to_rfc3339());
                println!(
                    "  attempts: {}  success rate: {:.1}%  detection rate: {:.1}%",
                    overall.total_attempts,
                    overall.success_rate * 100.0,
                    overall.detection_rate * 100.0
                );
                println!(
                    "  avg reward: {:.2}  avg execution time: {:.2}s",
                    overall.avg_reward, overall.avg_execution_time
                );

                if !report.best_strategies.is_empty() {
                    println!("Best strategies:");
                    for ranking in &report.best_strategies {
                        println!(
                            "  {} (avg reward {:.2}, {} successes, max {:.2})",
                            ranking.strategy,
                            ranking.avg_reward,
                            ranking.success_count,
                            ranking.max_reward
                        );
                    }
                }

                if report.failure_analysis.total_failures > 0 {
                    println!(
                        "Failures: {} total, {} unique",
                        report.failure_analysis.total_failures,
                        report.failure_analysis.unique_errors
                    );
                    for pattern in &report.failure_analysis.top_patterns {
                        println!("  {}x {}", pattern.count, pattern.error);
                    }
                }
            }
        }

        Command::History { limit } => {
            let attempts = learning.store().get_recent(limit).await?;

            if attempts.is_empty() {
                println!("No attempts recorded yet.");
            }
            for attempt in attempts {
                println!(
                    "{}  {}  {}  {}  reward {:+.2}",
                    attempt.timestamp.to_rfc3339(),
                    attempt.target,
                    attempt.vulnerability_type,
                    attempt.outcome,
                    attempt.reward
                );
            }
        }

        Command::Feedback { role, vuln_type } => {
            let feedback = learning.optimize_prompt(&role, &vuln_type).await?;

            if feedback.is_empty() {
                println!("(no adaptive feedback, baseline prompt)");
            } else {
                println!("{}", feedback);
            }
        }
    }

    db.close().await?;
    Ok(())
}
