pub type Endpoint = str;

pub const BASE: &Endpoint = "/api/v1";

pub const LOGIN: &Endpoint = "/auth/login";
pub const STATUS: &Endpoint = "/auth/status";
pub const SCHEDULES: &Endpoint = "/config/scheduledcharging/schedules";
pub const USER_CONFIG: &Endpoint = "/config/user";
pub const LIVE: &Endpoint = "/ws";
