pub mod date;
pub mod moment;
pub mod path;
