pub mod message_part;
pub mod rendered_message;
