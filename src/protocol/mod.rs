pub mod command;
pub mod handshake;
pub mod packet;
pub mod primitive;
pub mod response;
