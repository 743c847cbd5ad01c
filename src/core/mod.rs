pub mod cal2plan;
pub mod event;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod placeholder;
pub mod timeline;
