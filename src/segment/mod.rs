// Segment query service
//
// A CSV file is loaded once at startup into an immutable table sorted by
// (road_segment_id, time_step). The HTTP layer shares it read-only across
// handlers; a lookup is two binary searches returning a contiguous slice.

mod error;
mod server;
mod table;

pub use error::SegmentError;
pub use server::{cors_layer, create_router, serve, ApiError, AppState, HealthResponse, SegmentResponse};
pub use table::{SegmentRecord, SegmentTable};
