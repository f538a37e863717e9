use anyhow::{Context, Result};

use super::{
    config_model::{BackendServer, Client, Database, DotEnvyConfig, Mpesa, UserSecret},
    stage::Stage,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_USER_TOKEN_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} is invalid", key))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT")?
            .parse()
            .context("SERVER_PORT is not a port number")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is not a number")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is not a number")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_connections: match optional("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .context("DATABASE_MAX_CONNECTIONS is not a number")?,
            None => DEFAULT_MAX_CONNECTIONS,
        },
    };

    let client = Client {
        origin: optional("CLIENT_URL").unwrap_or_else(|| DEFAULT_CLIENT_ORIGIN.to_string()),
    };

    let mpesa = Mpesa {
        base_url: optional("MPESA_BASE_URL")
            .unwrap_or_else(|| get_stage().mpesa_base_url().to_string()),
        consumer_key: required("MPESA_CONSUMER_KEY")?,
        consumer_secret: required("MPESA_CONSUMER_SECRET")?,
        business_short_code: required("MPESA_BUSINESS_SHORTCODE")?,
        passkey: required("MPESA_PASSKEY")?,
        callback_url: required("MPESA_CALLBACK_URL")?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        client,
        mpesa,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_user_secret() -> Result<UserSecret> {
    dotenvy::dotenv().ok();

    let ttl_seconds = match optional("JWT_USER_TTL_SECONDS") {
        Some(raw) => raw
            .parse()
            .context("JWT_USER_TTL_SECONDS is not a number")?,
        None => DEFAULT_USER_TOKEN_TTL_SECONDS,
    };

    Ok(UserSecret {
        secret: required("JWT_USER_SECRET")?,
        ttl_seconds,
    })
}
