mod app_router;
pub mod automation;
pub mod campaign;
pub mod notification;

pub use app_router::AppRouter;
