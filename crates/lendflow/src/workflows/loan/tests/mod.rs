mod audit;
mod common;
mod display_code;
mod status;
