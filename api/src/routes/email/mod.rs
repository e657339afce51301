pub mod email_route;
