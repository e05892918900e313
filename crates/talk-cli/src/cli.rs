use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use talk_types::{AccountName, MessageId, VoteId};

#[derive(Parser)]
#[command(
    name = "talk",
    about = "Threaded message board with signed posts and likes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Board configuration file
    #[arg(short, long, global = true, default_value = "talk.toml")]
    pub config: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a default board configuration
    Init(InitArgs),
    /// Generate a signing key for an account and register it
    Keygen(KeygenArgs),
    /// Post a message or a reply
    Post(PostArgs),
    /// Like or dislike a message
    Like(LikeArgs),
    /// Show a message and its votes
    Show(ShowArgs),
    /// Show a message and every reply beneath it
    Thread(ThreadArgs),
    /// Show the action journal
    Log(LogArgs),
    /// Verify journal integrity and replay convergence
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct KeygenArgs {
    pub account: AccountName,
    /// Replace an existing key file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct PostArgs {
    #[arg(short, long)]
    pub author: AccountName,
    /// Requested id; 0 assigns one
    #[arg(long, default_value = "0")]
    pub id: MessageId,
    /// Parent message; 0 posts at top level
    #[arg(short, long, default_value = "0")]
    pub reply_to: MessageId,
    pub content: String,
}

#[derive(Args)]
pub struct LikeArgs {
    #[arg(long)]
    pub voter: AccountName,
    pub message: MessageId,
    /// Record a dislike instead of a like
    #[arg(long)]
    pub dislike: bool,
    /// Requested vote id; 0 assigns one
    #[arg(long, default_value = "0")]
    pub id: VoteId,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: MessageId,
}

#[derive(Args)]
pub struct ThreadArgs {
    /// Root message; 0 shows every top-level thread
    #[arg(default_value = "0")]
    pub id: MessageId,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct VerifyArgs {}
