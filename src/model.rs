use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type Milliamps = u32;

pub const CURRENT_LIMIT_MIN: Milliamps = 1;
pub const CURRENT_LIMIT_MAX: Milliamps = 32_000;
pub const CURRENT_LIMIT_DEFAULT: Milliamps = 6_000;

/// Dashboard address and password. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub host: String,
    pub password: String,
}

/// A charging current limit accepted by the charger, in milliamps.
///
/// Construction validates the [1, 32000] range, so an out-of-range value
/// is rejected before any API call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentLimit(Milliamps);

impl CurrentLimit {
    pub fn new(milliamps: Milliamps) -> Option<Self> {
        if (CURRENT_LIMIT_MIN..=CURRENT_LIMIT_MAX).contains(&milliamps) {
            Some(Self(milliamps))
        } else {
            None
        }
    }

    pub fn milliamps(self) -> Milliamps {
        self.0
    }
}

/// One per-day charging rule.
///
/// `CurrentLimit == 0` denotes "no limit set". Fields we do not model are
/// kept verbatim in `extra` so a fetched schedule can be written back
/// whole without dropping anything the dashboard put there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(rename = "CurrentLimit")]
    pub current_limit: Milliamps,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Day name to ordered schedule entries, as served by
/// `config/scheduledcharging/schedules`.
pub type Schedule = BTreeMap<String, Vec<ScheduleEntry>>;

/// Live charger readings pushed over the dashboard websocket.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LiveData {
    #[serde(rename = "Power", default)]
    pub power: Option<f64>,
    #[serde(rename = "TotalEnergy", default)]
    pub total_energy: Option<f64>,
    #[serde(rename = "CurrentLimit", default)]
    pub current_limit: Option<Milliamps>,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn current_limit_accepts_range() {
        assert_eq!(CurrentLimit::new(1).map(CurrentLimit::milliamps), Some(1));
        assert_eq!(
            CurrentLimit::new(CURRENT_LIMIT_DEFAULT).map(CurrentLimit::milliamps),
            Some(6_000)
        );
        assert_eq!(
            CurrentLimit::new(32_000).map(CurrentLimit::milliamps),
            Some(32_000)
        );
    }

    #[test]
    fn current_limit_rejects_out_of_range() {
        assert_eq!(CurrentLimit::new(0), None);
        assert_eq!(CurrentLimit::new(32_001), None);
    }

    #[test]
    fn live_data_ignores_unknown_fields() {
        let data: LiveData = serde_json::from_str(
            r#"{"Power": 7360.0, "Status": "Charging", "Vendor": "Zencharger"}"#,
        )
        .unwrap();
        assert_eq!(data.power, Some(7360.0));
        assert_eq!(data.status.as_deref(), Some("Charging"));
        assert_eq!(data.total_energy, None);
    }
}
