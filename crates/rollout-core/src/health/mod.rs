//! Post-deploy health checks: systemd unit state, HTTP endpoint, recent logs.

pub mod http;
pub mod service;

pub use http::{HttpProbe, ProbeOutcome, ReqwestProbe, health_url, is_valid_health_path};
pub use service::{ServiceState, recent_logs, service_status};
