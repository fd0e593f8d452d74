pub mod clipboard;
pub mod clock;

pub use clipboard::SystemClipboard;
pub use clock::SystemClock;
