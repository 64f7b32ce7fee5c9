pub mod decode;
pub mod services;
