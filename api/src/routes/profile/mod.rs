pub mod profile_route;
