pub mod mission;
pub mod profile;
pub mod question;
pub mod response;
pub mod user_mission;
