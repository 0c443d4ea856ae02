mod bot;
mod config;
mod quiz;
mod trivia;

use std::sync::Arc;

use dotenv::dotenv;
use teloxide::prelude::*;

use trivia::http::HttpBackend;

#[tokio::main]
async fn main() {
    // A missing .env is fine; everything can come from the real environment.
    dotenv().ok();

    pretty_env_logger::init();
    log::info!("Starting trivia bot...");

    let settings = config::Settings::from_env().expect("Invalid configuration");
    log::info!(
        "Using trivia backend at {} (timeout {:?})",
        settings.api_url,
        settings.request_timeout
    );

    let backend: bot::Backend = Arc::new(
        HttpBackend::new(settings.api_url, settings.request_timeout)
            .expect("Unable to build the HTTP client"),
    );

    let bot = Bot::from_env();

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![bot::storage(), backend])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
