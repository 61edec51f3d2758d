mod config;
mod engine;
mod error;
mod inference;
mod routes;
mod test_fixtures;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use config::ServerConfig;
use engine::ClassificationEngine;
use inference::load_inference_mode;
use routes::configure_routes;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = ServerConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let mode = load_inference_mode(&config.model_path());
    log::info!("Inference mode: {:?}", mode);

    let engine = web::Data::new(ClassificationEngine::new(mode));
    if !engine.mode().is_real_model() {
        log::warn!(
            "No trained model loaded; responses are tagged \"{}\"",
            engine.mode().model_type()
        );
    }
    let bind_address = config.bind_address();

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .app_data(engine.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
