//! Runtime configuration shared between the core and the server.
//!
//! Component settings ([`HubConfig`](crate::hub::HubConfig),
//! [`MonitorConfig`](crate::monitor::MonitorConfig),
//! [`ControllerConfig`](crate::lifecycle::ControllerConfig)) live next to
//! their components. Settings that may change while the process runs are
//! held in a [`ConfigStore`].

mod config_store;

pub use config_store::{ConfigStore, ConfigWatcher};
