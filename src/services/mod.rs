pub mod assignments;
pub mod system;

pub use assignments::AssignmentService;
pub use system::SystemService;
