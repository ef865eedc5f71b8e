pub mod webhook_reply;
