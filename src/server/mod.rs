pub mod command_dispatcher;
pub mod core_services;
pub mod identity;
pub mod response;
