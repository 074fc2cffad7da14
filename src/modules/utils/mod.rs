pub mod io;
pub mod logging;
pub mod time;

pub use io::{is_valid_email, read_line};
pub use logging::{initialize_logging, log_auth_event, log_data_operation};
pub use time::{Clock, ManualClock, SystemClock};
