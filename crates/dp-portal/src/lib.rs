//! Portal runtime: the injectable context, the documentation frame
//! controller, version resolution and the session that ties them to the host
//! history.

pub mod config;
pub mod context;
pub mod controller;
pub mod error_view;
pub mod resolve;
pub mod session;
pub mod view;

pub use config::PortalConfig;
pub use context::PortalContext;
pub use controller::ActiveFrameState;
pub use controller::ControllerState;
pub use controller::DocumentationController;
pub use controller::UpdateSource;
pub use error_view::ErrorView;
pub use resolve::ResolvedVersion;
pub use resolve::resolve_version;
pub use session::Page;
pub use session::PortalSession;
pub use session::Task;
pub use session::TaskResult;
