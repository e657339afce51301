pub mod dump_request;
pub mod dump_routes;
