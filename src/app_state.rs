use crate::app_service::StatusReport;

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    Status(Box<StatusReport>),
}
