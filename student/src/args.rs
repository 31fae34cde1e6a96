use clap::{Parser, Subcommand};
use codeloom_common::args::{CodespaceArgs, RedisArgs, StudentDirArgs, TokenArgs};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Server(ServerArgs),
}

#[derive(Debug, Clone, clap::Args)]
pub struct ServerArgs {
    #[command(flatten)]
    pub redis: RedisArgs,

    #[command(flatten)]
    pub students_dir: StudentDirArgs,

    #[command(flatten)]
    pub codespace: CodespaceArgs,

    #[command(flatten)]
    pub token: TokenArgs,

    #[arg(long, env = "STUDENT_PORT", default_value_t = 5003)]
    pub port: u16,

    #[arg(long, env = "WATCH_CONCURRENCY", default_value_t = 8)]
    pub watch_concurrency: usize,

    #[arg(long, env = "EMBED_WATCHER", default_value_t = false)]
    pub embed_watcher: bool,

    #[arg(long, env = "WATCH_INTERVAL_SECS", default_value_t = 60)]
    pub watch_interval_secs: u64,
}
