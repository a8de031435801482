pub mod fetch;
pub mod guacamole;
pub mod payload;
