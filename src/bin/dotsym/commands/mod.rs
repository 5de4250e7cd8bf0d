pub mod info;
pub mod resolve;
pub mod source;
pub mod validate;
