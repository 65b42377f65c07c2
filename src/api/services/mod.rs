pub mod admin;
pub mod affiliate;
pub mod dev;
pub mod health;
#[cfg(feature = "metrics")]
pub mod metrics;

pub use admin::{AdminService, admin_routes};
pub use affiliate::{AffiliateService, affiliate_routes};
pub use dev::{DevService, dev_routes};
pub use health::{AppStartTime, HealthService, health_routes};
