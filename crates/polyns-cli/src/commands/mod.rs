pub mod resume;
pub mod run;
