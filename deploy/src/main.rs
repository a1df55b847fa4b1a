mod artifacts;
mod command_line;
mod config;
mod contracts;
mod create;
mod deploy;
mod registry;
mod signature;
mod utils;

use anyhow::Result;
use clap::Parser;
use command_line::CommandLine;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cmd = CommandLine::parse();
    cmd.execute().await
}
