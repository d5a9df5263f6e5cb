//! Status bar (system tray) icon lifecycle management.
//!
//! Build a [`TrayContext`](tray::TrayContext) from a [`StatusBar`](native::StatusBar),
//! an [`EventRouter`](menu::EventRouter) and an [`EventBus`](daemon::EventBus), create
//! [`TrayIcon`](tray::TrayIcon)s from it and hand them to a
//! [`TrayService`](service::TrayService). Application callbacks run on whichever
//! thread drives the [`UiLoop`](tray::dispatch::UiLoop).

pub mod config;
pub mod daemon;
pub mod error;
pub mod menu;
pub mod native;
pub mod paths;
pub mod service;
pub mod tray;

pub use error::{ConversionError, NativeError, TrayError};
pub use service::TrayService;
pub use tray::{TrayContext, TrayIcon};
