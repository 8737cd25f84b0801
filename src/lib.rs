pub mod error;
pub mod output;
pub mod pipeline;
pub mod table;
pub mod vintage;

pub use error::{PipelineError, Result};
pub use table::{DistrictKey, DistrictTable, RawTopicTable};
pub use vintage::{Vintage, VintageSpec};
