pub mod calendar_status;
