pub mod check;
pub mod config;
pub mod logs;
pub mod run;
pub mod serve;
