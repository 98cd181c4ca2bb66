pub mod audio;
pub mod draw_queue;
