use prometheus::{Encoder, Gauge, TextEncoder};
use tokio::sync::watch;
use zencharger_rs::api;
use zencharger_rs::model::LiveData;

lazy_static! {
    static ref POWER_GAUGE: Gauge = register_gauge!(opts!(
        "charger_power",
        "momentary charging power reported by the charger (in W)",
    ))
    .unwrap();
    static ref TOTAL_ENERGY_GAUGE: Gauge = register_gauge!(opts!(
        "charger_total_energy",
        "lifetime energy delivered by the charger (in kWh)",
    ))
    .unwrap();
    static ref CURRENT_LIMIT_GAUGE: Gauge = register_gauge!(opts!(
        "charger_current_limit",
        "configured charging current limit (in mA)",
    ))
    .unwrap();
}

/// Feed one live sample into the Prometheus registry. Fields absent from
/// the sample leave their gauges at the previous value.
fn process_live_data(data: &LiveData) {
    if let Some(power) = data.power {
        POWER_GAUGE.set(power);
    }
    if let Some(total_energy) = data.total_energy {
        TOTAL_ENERGY_GAUGE.set(total_energy);
    }
    if let Some(current_limit) = data.current_limit {
        CURRENT_LIMIT_GAUGE.set(f64::from(current_limit));
    }
}

/// Follow the websocket live feed, updating gauges on every change.
pub async fn feed(mut live: watch::Receiver<LiveData>) {
    while live.changed().await.is_ok() {
        let data = live.borrow().clone();
        process_live_data(&data);
    }
    log::info!("live feed ended, metrics are frozen at last values");
}

/// Read metrics from the Prometheus exporter registry.
pub async fn read() -> Result<String, api::Error> {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode(&metric_families, &mut buffer)
        .or(Err(api::Error::Internal))?;
    String::from_utf8(buffer).or(Err(api::Error::Internal))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn live_samples_reach_the_registry() {
        let data = LiveData {
            power: Some(7360.0),
            total_energy: Some(1234.5),
            current_limit: Some(16_000),
            status: Some(String::from("Charging")),
        };
        process_live_data(&data);

        let exported = read().await.unwrap();
        assert!(exported.contains("charger_power 7360"));
        assert!(exported.contains("charger_current_limit 16000"));
    }
}
