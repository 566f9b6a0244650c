//! Ember CLI - command-line driver for the particle engine

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{inspect, list, run};

#[derive(Parser)]
#[command(name = "ember")]
#[command(about = "Headless driver for the Ember particle engine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless simulation and report statistics
    Run {
        /// Template to spawn
        template: String,

        /// Path to the template directory
        #[arg(long, default_value = "templates")]
        templates: String,

        /// Particles spawned in a ring at the start
        #[arg(long, default_value = "8")]
        count: u32,

        /// Ticks to simulate
        #[arg(long, default_value = "100")]
        ticks: u32,

        /// Pool slot capacity
        #[arg(long, default_value = "512")]
        capacity: usize,

        /// RNG seed override; runs with equal seeds replay exactly
        #[arg(long)]
        seed: Option<u32>,

        /// Heightmap PNG; a flat 32x32 arena when omitted
        #[arg(long)]
        heightmap: Option<String>,

        /// Water surface height; tiles flagged as water become wet
        #[arg(long)]
        water_level: Option<f32>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show one template's parsed fields
    Inspect {
        /// Template name (file stem)
        name: String,

        /// Path to the template directory
        #[arg(long, default_value = "templates")]
        templates: String,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List the loaded template registry
    List {
        /// Path to the template directory
        #[arg(long, default_value = "templates")]
        templates: String,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            template,
            templates,
            count,
            ticks,
            capacity,
            seed,
            heightmap,
            water_level,
            format,
        } => run::run(run::RunArgs {
            template,
            templates,
            count,
            ticks,
            capacity,
            seed,
            heightmap,
            water_level,
            format,
        }),
        Commands::Inspect {
            name,
            templates,
            format,
        } => inspect::run(&name, &templates, &format),
        Commands::List { templates, format } => list::run(&templates, &format),
    }
}
