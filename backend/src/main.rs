use actix_web::{web, App, HttpServer};
use backend::config::AppConfig;
use backend::job_controller::state::{start_job_updater, JobsState};
use backend::services;
use backend::services::batch::BatchContext;
use env_logger::Env;
use log::info;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env();
    let assets = config.load_assets();
    let host = config.host.clone();
    let port = config.port;
    let json_limit = config.json_limit_mb * 1024 * 1024;

    // Initialize job controller state
    let (jobs_state, rx) = JobsState::new(100, config.retain_jobs);

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        start_job_updater(updater_state, rx).await;
    });

    info!(
        "Server running at http://{}:{} (records in {}, verification links to {})",
        host,
        port,
        config.database_path.display(),
        config.verify_base_url
    );
    let context = BatchContext::new(config, assets);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(json_limit))
            .app_data(web::PayloadConfig::default().limit(json_limit))
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(context.clone()))
            .service(services::batch::configure_routes())
            .service(services::data_sources::csv::configure_routes())
            .service(services::verify::configure_routes())
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
