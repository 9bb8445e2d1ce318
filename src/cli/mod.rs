use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "dailybonus",
    about = "V2EX daily check-in & activity browsing automation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the scheduler and stats API until interrupted
    Service,
    /// Run one check-in now
    CheckIn,
    /// Run one browsing pass now
    Browse,
    /// Show today's progress
    Status,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
