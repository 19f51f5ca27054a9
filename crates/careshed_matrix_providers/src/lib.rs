pub mod as_the_crow_flies;
pub mod google_api;
pub mod route_matrix_provider;
