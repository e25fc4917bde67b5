pub mod twilio_client;
pub mod webdriver_client;
