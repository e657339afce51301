pub mod app_state;
pub mod current_user;
pub mod http;
pub mod store_task;
