pub mod app_command;
pub mod handler;

pub use app_command::AppCommand;
pub use handler::handle;
