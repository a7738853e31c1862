pub mod course;
pub mod question;
