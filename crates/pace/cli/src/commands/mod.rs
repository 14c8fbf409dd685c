//! Command implementations for the eid-pace CLI

mod pace;
mod personal_data;

pub(crate) use pace::pace_command;
pub(crate) use personal_data::read_personal_data_command;
