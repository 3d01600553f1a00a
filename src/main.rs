#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate prometheus;
#[macro_use]
extern crate rocket;

use config::Config;
use rocket::fairing::AdHoc;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Build, Rocket, State};
use zencharger_rs::api;
use zencharger_rs::integration::Integration;
use zencharger_rs::model::{Credentials, CurrentLimit, CURRENT_LIMIT_DEFAULT};

mod metrics;

#[derive(Clone, serde::Deserialize)]
pub struct ZenchargerConfig {
    host: String,
    password: String,
}

pub fn read_settings() -> ZenchargerConfig {
    let mut settings = Config::default();
    settings
        .merge(config::Environment::with_prefix("ZC"))
        .unwrap();

    settings.try_into().expect("Configuration error")
}

#[derive(serde::Deserialize)]
pub struct SetCurrentLimitRequest {
    #[serde(default = "default_current")]
    current: u32,
}

fn default_current() -> u32 {
    CURRENT_LIMIT_DEFAULT
}

#[get("/metrics")]
async fn metrics_route() -> Result<String, api::Error> {
    metrics::read().await
}

#[get("/status")]
async fn status_route(state: &State<Integration>) -> Result<String, api::Error> {
    let status = state.api().status().await?;
    Ok(status.to_string())
}

#[post("/current-limit", format = "json", data = "<request>")]
async fn current_limit_route(
    state: &State<Integration>,
    request: Json<SetCurrentLimitRequest>,
) -> Result<Status, api::Error> {
    /* validated before the API client is touched */
    let limit = CurrentLimit::new(request.current)
        .ok_or(api::Error::InvalidCurrentLimit(request.current))?;

    state.api().update_current_limit(limit).await?;
    Ok(Status::NoContent)
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    let settings = read_settings();

    rocket::build()
        .attach(AdHoc::try_on_ignite("zencharger", move |rocket| async move {
            let credentials = Credentials {
                host: settings.host.clone(),
                password: settings.password.clone(),
            };

            match Integration::start(credentials).await {
                Ok(integration) => {
                    tokio::spawn(metrics::feed(integration.live()));
                    Ok(rocket.manage(integration))
                }
                Err(e) => {
                    log::error!("zencharger setup failed, not ready: {:?}", e);
                    Err(rocket)
                }
            }
        }))
        .attach(AdHoc::on_shutdown("zencharger disconnect", |rocket| {
            Box::pin(async move {
                if let Some(integration) = rocket.state::<Integration>() {
                    integration.stop().await;
                }
            })
        }))
        .mount("/", routes![metrics_route, status_route, current_limit_route])
}
