pub mod entity;
pub mod jwt;
pub mod password;
pub mod session;
