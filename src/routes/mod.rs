pub mod assignments;

pub mod system;

pub use assignments::configure_assignment_routes;
pub use system::configure_system_routes;
