//! Network subsystem for UDP telemetry ingress

pub mod ingress;
pub mod udp;

pub use ingress::{IngressStats, IngressStatsSnapshot, UdpIngress};
pub use udp::create_socket;
