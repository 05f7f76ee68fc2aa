mod api;
mod models;

use log::info;
use models::config::Config;
use models::context::Context;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::env;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "gallery.yaml";

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = env::var("GALLERY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    TermLogger::init(
        config.level_filter(),
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;
    info!("Loaded configuration from {}", config_path);

    let context = Arc::new(Context::new(config));
    let _rocket = rocket::build()
        .manage(api::build_schema(context))
        .mount("/", rocket::routes![api::graphql_query, api::graphql_request])
        .launch()
        .await?;

    Ok(())
}
