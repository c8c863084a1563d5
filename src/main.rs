/*
 * Responsibility
 * - tokio runtime 起動
 * - 引数の解析と app::run() の呼び出し（ロジックは置かない）
 */
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

mod app;

/// Validate a bearer token against the policy configured in the environment.
#[derive(Parser, Debug)]
#[command(name = "bearer-validator", version, about)]
struct Args {
    /// Full Authorization header value, e.g. "Bearer eyJ..."
    #[arg(long, env = "AUTHORIZATION")]
    header: String,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    app::init_tracing();

    app::run(&args.header).await
}
