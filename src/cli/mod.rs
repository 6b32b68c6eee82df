use crate::config::Role;
use clap::{Parser, Subcommand};

/// `alertwire` - ordered progress-event streaming for alert triage tasks.
#[derive(Parser, Debug)]
#[command(name = "alertwire")]
#[command(version)]
#[command(about = "Stream alert triage progress through worker, coordinator and gateway hops.", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.alertwire/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve one hop of the pipeline
    Serve {
        /// worker, coordinator or gateway
        #[arg(long)]
        role: Option<Role>,

        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Next hop inward (coordinator and gateway only)
        #[arg(long)]
        upstream: Option<String>,
    },

    /// Submit an alert and print its task id
    Submit {
        /// Alert JSON, or @path to read it from a file
        alert: String,

        /// Planner to start with
        #[arg(long)]
        agent: Option<String>,
    },

    /// Follow a task's events until it finishes
    Watch {
        task_id: String,

        /// Treat events up to this id as already seen
        #[arg(long, default_value_t = 0)]
        after: u64,
    },

    /// Print a task's state and full event log
    Status { task_id: String },

    /// Submit an alert and follow it to completion
    Run {
        /// Alert JSON, or @path to read it from a file
        alert: String,

        /// Planner to start with
        #[arg(long)]
        agent: Option<String>,
    },
}
