pub mod detect;
pub mod grade;
pub mod init;
pub mod mastery;
pub mod normalize;
pub mod validate;
