use super::*;

mod collaboration;
mod library;
mod session;
