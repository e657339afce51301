pub mod dumps;
pub mod email;
pub mod health_route;
pub mod profile;
