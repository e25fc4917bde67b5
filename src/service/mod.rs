pub mod calendar_parser;
pub mod calendar_service;
pub mod status_notifier;
