pub mod dataset;
pub mod enums;
pub mod ids;
pub mod instrument;
pub mod macros;
pub mod observation;
pub mod quantities;
pub mod step;
pub mod time;

pub use dataset::*;
pub use enums::*;
pub use ids::*;
pub use instrument::*;
pub use observation::*;
pub use quantities::*;
pub use step::*;
pub use time::*;
