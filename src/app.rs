/*
 * Responsibility
 * - Config読み込み → 鍵の取得元 (JWKS / PEM) と Validator の生成
 * - Authorization ヘッダ値を1回検証し、結果 (claims) を出力する
 */
use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bearer_validator::{
    ValidationError,
    config::Config,
    services::auth::{build_key_resolver, build_validator},
};

pub fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,bearer_validator=debug cargo run -- --header "Bearer ..."
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run(header: &str) -> Result<ExitCode> {
    let config = Config::from_env()?;
    let policy = config.policy();

    let resolver = build_key_resolver(&config).await?;
    let validator = build_validator(&config);

    match validator.validate(header, resolver.as_ref(), &policy) {
        Ok(claims) => {
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", err);
            if let ValidationError::ClaimsInvalid { claims, .. } = &err {
                eprintln!("{}", serde_json::to_string_pretty(claims)?);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
