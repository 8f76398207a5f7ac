pub mod extraction;
pub mod geocode;
pub mod notice;

pub use extraction::ExtractionResult;
pub use geocode::GeocodeResult;
pub use notice::{parse_notice_date, GeocodingStatus, NoticeRecord, ProcessingLogEntry};
