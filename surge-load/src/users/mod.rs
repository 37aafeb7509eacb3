//! Concrete user classes

pub mod health_check;
pub mod socketio;
