mod actuator;
mod classifier;
mod error;
mod handlers;
mod models;
mod settings;
mod storage;
mod telemetry;

#[cfg(test)]
mod test_support;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use crate::actuator::ActuatorClient;
use crate::classifier::OnnxClassifier;
use crate::handlers::AppState;
use crate::settings::Settings;
use crate::storage::ImageStore;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let settings = Settings::load().map_err(io::Error::other)?;
    telemetry::init(&settings.logging);
    tracing::debug!(?settings, "configuration loaded");

    let classifier = OnnxClassifier::load(&settings.model).map_err(io::Error::other)?;
    let store = ImageStore::open(&settings.storage.upload_dir, &settings.storage.file_name)?;
    let actuator = ActuatorClient::new(&settings.actuator).map_err(io::Error::other)?;
    tracing::info!(servo_url = actuator.servo_url(), "actuator configured");

    let state = web::Data::new(AppState {
        classifier: Arc::new(classifier),
        store: Arc::new(store),
        actuator,
        max_body_bytes: settings.server.max_upload_bytes,
    });

    let bind = (settings.server.host.as_str(), settings.server.port);
    tracing::info!("Server running at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(handlers::routes)
    })
    .bind(bind)?
    .run()
    .await
}
